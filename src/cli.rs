use bilirename_config::Overrides;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "Progress, the rename preview and rename results are printed to stdout. \
Failed lookup attempts are logged to stderr as warnings, which the default level shows; \
RUST_LOG=error or a redirected stderr hides them.";

#[derive(Parser, Debug)]
#[command(name = "bilirename")]
#[command(about = "Rename numbered Bilibili download directories by title and publish date")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing the identifier-named subdirectories
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Only process the first N identifiers, or "all"
    #[arg(short, long, value_name = "N|all")]
    pub limit: Option<String>,

    /// Name template, e.g. "index-title-(yyyy-MM-dd-hh-mm-ss)"
    #[arg(short, long)]
    pub template: Option<String>,

    /// Identifiers resolved concurrently per window
    #[arg(long, value_name = "N")]
    pub window_size: Option<usize>,

    /// Attempts per identifier before giving up
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Rename without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print the rename preview and stop
    #[arg(long, conflicts_with = "yes")]
    pub dry_run: bool,

    /// Verbose output level on stderr (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            limit: self.limit.clone(),
            template: self.template.clone(),
            window_size: self.window_size,
            max_attempts: self.max_attempts,
        }
    }

    /// `RUST_LOG` wins when set; otherwise `-v` raises the level from WARN.
    pub fn log_filter(&self) -> EnvFilter {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from(["bilirename", "--root", "/data", "--limit", "10", "--window-size", "3"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.root, Some(PathBuf::from("/data")));
        assert_eq!(overrides.limit.as_deref(), Some("10"));
        assert_eq!(overrides.window_size, Some(3));
        assert_eq!(overrides.template, None);
        assert_eq!(overrides.max_attempts, None);
    }

    #[rstest]
    #[case(&["bilirename"], 0)]
    #[case(&["bilirename", "-v"], 1)]
    #[case(&["bilirename", "-vvv"], 3)]
    fn test_verbosity(#[case] args: &[&str], #[case] expected: u8) {
        assert_eq!(Cli::parse_from(args).verbose, expected);
    }

    #[test]
    fn test_help_explains_where_attempts_are_logged() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Failed lookup attempts are logged to stderr"));
    }

    #[test]
    fn test_dry_run_conflicts_with_yes() {
        assert!(Cli::try_parse_from(["bilirename", "--yes", "--dry-run"]).is_err());
    }
}
