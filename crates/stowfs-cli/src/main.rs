//! stowfs command line.
//!
//! Drives the filesystem adapter the way a protocol session would: every
//! path is a protocol path, resolved against the session cursor and root.
//!
//! Usage:
//!   stowfs --local ~/ftp ls -l /photos
//!   stowfs --config stowfs.toml stat /readme.txt
//!   stowfs --local ~/ftp --root media put ./cat.jpg /photos/cat.jpg

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stowfs::vfs::{AnyStorage, Fact, OpenMode, StorageFs, VirtualFs};
use stowfs::{FsConfig, Session, StorageConfig};

/// Permission letters granted to the CLI user in MLSD output.
const CLI_PERMS: &str = "elradfw";

#[derive(Parser, Debug)]
#[command(name = "stowfs")]
#[command(about = "Browse a key store as a filesystem")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve this local directory (overrides the config's storage)
    #[arg(long)]
    local: Option<String>,

    /// Key prefix that `/` maps onto (overrides the config's root)
    #[arg(long)]
    root: Option<String>,

    /// Session user name
    #[arg(long, default_value = "anonymous")]
    user: String,

    /// Starting directory
    #[arg(long, default_value = "/")]
    cwd: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: String,

        /// Long listing, like LIST
        #[arg(short, long)]
        long: bool,

        /// Machine listing, like MLSD
        #[arg(long, conflicts_with = "long")]
        mlsd: bool,

        /// MLSD facts to report, as in `OPTS MLST` (e.g. "type;size;modify;")
        #[arg(long, requires = "mlsd")]
        facts: Option<String>,
    },
    /// Show the synthesized stat record
    Stat { path: String },
    /// Copy a file to stdout
    Cat { path: String },
    /// Upload a local file
    Put {
        local: PathBuf,
        /// Destination (defaults to the local file name)
        dest: Option<String>,

        /// Open mode for the destination: "wb" truncates, "ab" appends
        #[arg(long, default_value = "wb", value_parser = OpenMode::parse)]
        mode: OpenMode,
    },
    /// Remove a file
    Rm { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = resolve_config(&args).await?;
    tracing::debug!(backend = config.storage.kind(), root = %config.root, "starting session");

    let mut fs = config.connect(Session::new(&args.user))?;
    let start = fs.ftp2fs(&args.cwd);
    if !fs.isdir(Path::new(&start)).await? {
        anyhow::bail!("no such directory: {}", args.cwd);
    }
    fs.chdir(Path::new(&start))?;

    run(&fs, args.command).await
}

async fn resolve_config(args: &Args) -> Result<FsConfig> {
    let mut config = match &args.config {
        Some(path) => FsConfig::load(path).await?,
        None => FsConfig::default(),
    };
    if let Some(dir) = &args.local {
        config.storage = StorageConfig::local(dir.clone());
    }
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if matches!(config.storage, StorageConfig::Memory) {
        tracing::warn!("no storage configured, using an empty in-memory store");
    }
    Ok(config)
}

async fn run(fs: &StorageFs<AnyStorage>, command: Command) -> Result<()> {
    let mut out = tokio::io::stdout();

    match command {
        Command::Ls { path, long, mlsd, facts } => {
            let key = fs.ftp2fs(&path);
            let dir = Path::new(&key);
            let names = fs.listdir(dir).await.with_context(|| format!("ls {path}"))?;
            let lines = if long {
                fs.format_list(dir, &names).await?
            } else if mlsd {
                let facts = match facts {
                    Some(list) => Fact::parse_list(&list),
                    None => Fact::ALL.to_vec(),
                };
                fs.format_mlsx(dir, &names, CLI_PERMS, &facts).await?
            } else {
                names
            };
            for line in lines {
                out.write_all(line.as_bytes()).await?;
                out.write_all(b"\n").await?;
            }
        }
        Command::Stat { path } => {
            let key = fs.ftp2fs(&path);
            let st = fs.stat(Path::new(&key)).await.with_context(|| format!("stat {path}"))?;
            let text = format!(
                "  Path: {}\n  Size: {}\n  Mode: {} ({:o})\n Links: {}\n Owner: {} ({})\n Group: {} ({})\nModify: {}\n",
                fs.fs2ftp(&key),
                st.size,
                st.filemode(),
                st.mode,
                st.nlink,
                fs.get_user_by_uid(st.uid),
                st.uid,
                fs.get_group_by_gid(st.gid),
                st.gid,
                st.mtime,
            );
            out.write_all(text.as_bytes()).await?;
        }
        Command::Cat { path } => {
            let mut file = fs
                .open(Path::new(&path), OpenMode::Read)
                .await
                .with_context(|| format!("cat {path}"))?;
            tokio::io::copy(&mut file, &mut out).await?;
        }
        Command::Put { local, dest, mode } => {
            if !mode.writes() {
                anyhow::bail!("put needs a write mode, got {mode}");
            }
            let dest = match dest {
                Some(dest) => dest,
                None => local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("no file name in {}", local.display()))?,
            };
            let mut src = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("open {}", local.display()))?;
            let mut file = fs
                .open(Path::new(&dest), mode)
                .await
                .with_context(|| format!("put {dest}"))?;
            let n = tokio::io::copy(&mut src, &mut file).await?;
            file.shutdown().await?;
            tracing::info!(dest = %fs.ftpnorm(&dest), bytes = n, "uploaded");
        }
        Command::Rm { path } => {
            let key = fs.ftp2fs(&path);
            fs.remove(Path::new(&key)).await.with_context(|| format!("rm {path}"))?;
        }
    }

    out.flush().await?;
    Ok(())
}
