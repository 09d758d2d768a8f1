//! Protocol path normalization and protocol/key translation.
//!
//! Two path spaces meet here:
//!
//! - **Protocol paths** are what the client sees: absolute, `/`-rooted,
//!   `/photos/cat.jpg`. The session cursor lives in this space.
//! - **Keys** are what the store sees: relative, no leading separator,
//!   `media/photos/cat.jpg`, all under the session root prefix.
//!
//! Everything is lexical. The store has no symlinks, so there is nothing to
//! resolve beyond `.` and `..`.

use std::path::Path;

use super::error::{FsError, FsResult};
use super::types::SEP;

/// Borrow a path argument as text, failing on non-UTF-8 input.
pub fn as_text(path: &Path) -> FsResult<&str> {
    path.to_str()
        .ok_or_else(|| FsError::NonUtf8Path(path.to_string_lossy().into_owned()))
}

/// Normalize `path` against `cwd` into an absolute protocol path.
///
/// Relative paths are joined onto `cwd`. Repeated separators and `.` are
/// dropped, `..` pops a component but never climbs above `/`, and the
/// result has no trailing separator unless it is `/` itself.
pub fn normalize(cwd: &str, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let base = if path.starts_with(SEP) { "" } else { cwd };
    for component in base.split(SEP).chain(path.split(SEP)) {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    let mut out = String::with_capacity(path.len() + cwd.len() + 1);
    out.push(SEP);
    out.push_str(&parts.join("/"));
    out
}

/// Normalize a session root into key form: no leading or trailing separator.
pub fn normalize_root(root: &str) -> String {
    normalize("/", root).trim_start_matches(SEP).to_string()
}

/// Map a normalized protocol path onto a key under `root`.
pub fn to_key(root: &str, protocol_path: &str) -> String {
    let rel = protocol_path.trim_start_matches(SEP);
    if root.is_empty() {
        rel.to_string()
    } else if rel.is_empty() {
        root.to_string()
    } else {
        format!("{root}/{rel}")
    }
}

/// Map a key back to the protocol path it is visible as.
///
/// Keys outside `root` collapse to `/`.
pub fn from_key(root: &str, key: &str) -> String {
    let key = key.trim_start_matches(SEP);
    let rel = if root.is_empty() {
        key
    } else if key.trim_end_matches(SEP) == root {
        ""
    } else {
        match key.strip_prefix(root).and_then(|rest| rest.strip_prefix(SEP)) {
            Some(rest) => rest,
            None => return "/".to_string(),
        }
    };
    normalize("/", rel)
}

/// Whether `key` lies at or under `root`.
pub fn is_under_root(root: &str, key: &str) -> bool {
    let key = key.trim_start_matches(SEP);
    if key.split(SEP).any(|c| c == "..") {
        return false;
    }
    if root.is_empty() {
        return true;
    }
    let key = key.trim_end_matches(SEP);
    key == root || key.strip_prefix(root).is_some_and(|rest| rest.starts_with(SEP))
}

/// Join a directory key and an entry name.
pub fn join_key(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == "/" {
        name.to_string()
    } else if dir.ends_with(SEP) {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Final component of a key, without any trailing separator.
pub fn basename(key: &str) -> &str {
    let trimmed = key.trim_end_matches(SEP);
    trimmed.rsplit(SEP).next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relative_and_absolute() {
        assert_eq!(normalize("/", "photos"), "/photos");
        assert_eq!(normalize("/photos", "2024/cat.jpg"), "/photos/2024/cat.jpg");
        assert_eq!(normalize("/photos", "/docs"), "/docs");
        assert_eq!(normalize("/photos", ""), "/photos");
    }

    #[test]
    fn test_normalize_dots_and_separators() {
        assert_eq!(normalize("/a/b", ".."), "/a");
        assert_eq!(normalize("/a/b", "../../.."), "/");
        assert_eq!(normalize("/", "//a///b/./c/"), "/a/b/c");
        assert_eq!(normalize("/a", "./b/../c"), "/a/c");
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root(""), "");
        assert_eq!(normalize_root("/"), "");
        assert_eq!(normalize_root("/media/uploads/"), "media/uploads");
    }

    #[test]
    fn test_to_key() {
        assert_eq!(to_key("", "/"), "");
        assert_eq!(to_key("", "/a/b"), "a/b");
        assert_eq!(to_key("media", "/"), "media");
        assert_eq!(to_key("media", "/a"), "media/a");
    }

    #[test]
    fn test_from_key() {
        assert_eq!(from_key("", ""), "/");
        assert_eq!(from_key("", "/"), "/");
        assert_eq!(from_key("", "photos/"), "/photos");
        assert_eq!(from_key("media", "media"), "/");
        assert_eq!(from_key("media", "media/"), "/");
        assert_eq!(from_key("media", "media/a/b"), "/a/b");
        assert_eq!(from_key("media", "mediax/a"), "/");
        assert_eq!(from_key("media", "other"), "/");
    }

    #[test]
    fn test_is_under_root() {
        assert!(is_under_root("", "anything/at/all"));
        assert!(!is_under_root("", "a/../../etc"));
        assert!(is_under_root("media", "media"));
        assert!(is_under_root("media", "media/x/"));
        assert!(!is_under_root("media", "mediax"));
        assert!(!is_under_root("media", "docs/a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_as_text_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = Path::new(OsStr::from_bytes(b"photos/\xff.jpg"));
        assert!(matches!(as_text(raw), Err(FsError::NonUtf8Path(_))));
        assert_eq!(as_text(Path::new("photos/cat.jpg")).unwrap(), "photos/cat.jpg");
    }

    #[test]
    fn test_join_and_basename() {
        assert_eq!(join_key("", "a.txt"), "a.txt");
        assert_eq!(join_key("/", "a.txt"), "a.txt");
        assert_eq!(join_key("photos", "a.jpg"), "photos/a.jpg");
        assert_eq!(join_key("photos/", "2024/"), "photos/2024/");
        assert_eq!(basename("photos/2024/"), "2024");
        assert_eq!(basename("a.txt"), "a.txt");
    }
}
