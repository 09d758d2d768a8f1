//! `LIST` and `MLSD`/`MLST` line rendering.
//!
//! Pure functions over [`StatRecord`]s. The [`VirtualFs`](super::VirtualFs)
//! formatters stat each entry and hand the record here. Lines carry no
//! terminator; the protocol layer appends CRLF.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::path::basename;
use super::types::{Fact, StatRecord};

/// Entries older than this show a year instead of a time of day.
const SIX_MONTHS_SECS: i64 = 180 * 24 * 60 * 60;

fn datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Render one `ls -l` style line.
///
/// `now` is epoch seconds; it decides between the `HH:MM` and year forms.
pub fn list_line(name: &str, st: &StatRecord, owner: &str, group: &str, now: i64) -> String {
    let mtime = datetime(st.mtime);
    let stamp = if now - st.mtime > SIX_MONTHS_SECS {
        mtime.format("%b %d  %Y")
    } else {
        mtime.format("%b %d %H:%M")
    };
    format!(
        "{} {:>3} {:<8} {:<8} {:>8} {} {}",
        st.filemode(),
        st.nlink,
        owner,
        group,
        st.size,
        stamp,
        basename(name),
    )
}

/// Permission letters for the `perm` fact.
///
/// `perms` is the user's grant string (`elradfmw` style).
pub fn perm_fact(perms: &str, is_dir: bool) -> String {
    if is_dir {
        let mut out: String = perms.chars().filter(|c| !"arw".contains(*c)).collect();
        if perms.contains(['w', 'a', 'f']) {
            out.push('c');
        }
        if perms.contains('d') {
            out.push('p');
        }
        out
    } else {
        perms.chars().filter(|c| !"celmp".contains(*c)).collect()
    }
}

/// Render one MLSx line with the requested facts, sorted by fact name.
pub fn mlsx_line(name: &str, st: &StatRecord, perms: &str, facts: &[Fact]) -> String {
    let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
    for fact in facts {
        let value = match fact {
            Fact::Type => (if st.is_dir() { "dir" } else { "file" }).to_string(),
            Fact::Size => st.size.to_string(),
            Fact::Modify => datetime(st.mtime).format("%Y%m%d%H%M%S").to_string(),
            Fact::Perm => perm_fact(perms, st.is_dir()),
            Fact::UnixMode => format!("0{:o}", st.perm()),
            Fact::UnixUid => st.uid.to_string(),
            Fact::UnixGid => st.gid.to_string(),
            Fact::Unique => format!("{:x}g{:x}", st.dev, st.ino),
        };
        values.insert(fact.name(), value);
    }

    let mut line = String::new();
    for (key, value) in &values {
        line.push_str(key);
        line.push('=');
        line.push_str(value);
        line.push(';');
    }
    line.push(' ');
    line.push_str(basename(name));
    line
}
