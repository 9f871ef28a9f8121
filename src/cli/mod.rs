//! CLI definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Default metadata file name, created in the local root.
pub const DEFAULT_METADB: &str = ".~dropmirror.db3";

/// Transfer direction.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Remote to local (the only implemented direction)
    #[default]
    Download,
    /// Local to remote
    Upload,
    /// Both ways
    Both,
}

/// dropmirror - one-way Dropbox mirror
#[derive(Parser, Debug)]
#[command(name = "dropmirror", author, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Local directory to mirror into
    #[arg(required_unless_present = "version")]
    pub local: Option<PathBuf>,

    /// Remote folder to mirror (default: the whole Dropbox)
    #[arg(default_value = "")]
    pub remote: String,

    /// Transfer direction
    #[arg(short, long, value_enum, default_value_t)]
    pub direction: Direction,

    /// RegEx matching remote paths to skip
    #[arg(short = 'x', long)]
    pub exclude: Vec<String>,

    /// RegEx overriding --exclude
    #[arg(short, long)]
    pub include: Vec<String>,

    /// RegEx protecting local paths from deletion
    #[arg(short, long)]
    pub keep: Vec<String>,

    /// Translate symlink targets: '<remote>;<local>'
    #[arg(short = 'y', long)]
    pub trsymlink: Vec<String>,

    /// Only transfer, never delete local files
    #[arg(short, long)]
    pub no_delete: bool,

    /// Force a new interactive login
    #[arg(short, long)]
    pub login: bool,

    /// Use an existing access token
    #[arg(short, long)]
    pub token: Option<String>,

    /// Timeout in seconds for remote operations
    #[arg(short = 'T', long, default_value_t = 120.0)]
    pub timeout: f64,

    /// Metadata file name, always located in the local folder
    #[arg(short, long, default_value = DEFAULT_METADB)]
    pub metadb: String,

    /// Drop all sync history before running
    #[arg(short = 'R', long)]
    pub resetmeta: bool,

    /// Continue past symlink creation errors
    #[arg(short = 'Y', long)]
    pub ignsymlink: bool,

    /// Only mirror the directory structure
    #[arg(short = 'D', long)]
    pub dir_only: bool,

    /// Remove records not seen by this run (after a successful run)
    #[arg(long)]
    pub prune: bool,

    /// Do not transfer or delete any files
    #[arg(long)]
    pub dry_run: bool,

    /// App key used for interactive login and token refresh
    #[arg(long, env = "DROPMIRROR_APP_KEY", hide_env_values = true)]
    pub app_key: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print version and exit
    #[arg(short = 'V', long)]
    pub version: bool,

    /// Override the sync timestamp (YYYYmmddHHMMSS)
    #[arg(long, hide = true)]
    pub synctime: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["dropmirror", "/tmp/target"]).unwrap();
        assert_eq!(cli.local, Some(PathBuf::from("/tmp/target")));
        assert_eq!(cli.remote, "");
        assert_eq!(cli.direction, Direction::Download);
        assert_eq!(cli.metadb, DEFAULT_METADB);
        assert!((cli.timeout - 120.0).abs() < f64::EPSILON);
        assert!(cli.exclude.is_empty());
        assert!(!cli.no_delete);
    }

    #[test]
    fn test_repeatable_lists_and_short_flags() {
        let cli = Cli::try_parse_from([
            "dropmirror",
            "/tmp/target",
            "/Photos",
            "-x",
            "raw",
            "--exclude=tmp",
            "-i",
            "keepme",
            "-k",
            r"notes\.txt",
            "-y",
            "a;b",
            "-nDRY",
            "-vv",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.remote, "/Photos");
        assert_eq!(cli.exclude, vec!["raw", "tmp"]);
        assert_eq!(cli.include, vec!["keepme"]);
        assert_eq!(cli.keep, vec![r"notes\.txt"]);
        assert_eq!(cli.trsymlink, vec!["a;b"]);
        assert!(cli.no_delete && cli.dir_only && cli.resetmeta && cli.ignsymlink);
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
    }

    #[test]
    fn test_version_needs_no_local() {
        let cli = Cli::try_parse_from(["dropmirror", "-V"]).unwrap();
        assert!(cli.version);
        assert!(cli.local.is_none());
        assert!(Cli::try_parse_from(["dropmirror"]).is_err());
    }

    #[test]
    fn test_direction_values() {
        let cli = Cli::try_parse_from(["dropmirror", "x", "-d", "both"]).unwrap();
        assert_eq!(cli.direction, Direction::Both);
        assert!(Cli::try_parse_from(["dropmirror", "x", "-d", "sideways"]).is_err());
    }
}
