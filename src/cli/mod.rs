pub mod configure;
pub mod menu;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the stderr log filter.
pub const LOG_ENV: &str = "CCM_LOG";

/// Claude Code usage in the menu bar (SwiftBar/xbar plugin)
///
/// Without flags, prints the menu for the host to display. The flags are
/// what the menu's own submenu items invoke.
#[derive(Parser, Debug, Default)]
#[command(name = "ccm-bar", version, about, long_about = None)]
pub struct Cli {
    /// Select the plan limits are measured against (pro, max5, max20, custom)
    #[arg(long, value_name = "PLAN")]
    pub set_plan: Option<String>,

    /// Toggle a metric in the menu bar title (token_pct, cost, cost_pct, msg, msg_pct)
    #[arg(long, value_name = "METRIC")]
    pub toggle_display: Option<String>,
}

impl Cli {
    /// Parse arguments, treating anything unparseable as "no flags" so the
    /// host still gets a menu. `--help` and `--version` behave as usual.
    pub fn parse_lenient() -> Self {
        match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp
                        | ErrorKind::DisplayVersion
                        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) =>
            {
                e.exit()
            }
            Err(e) => {
                tracing::warn!("ignoring arguments: {}", e.kind());
                Cli::default()
            }
        }
    }

    /// Whether this invocation changes config instead of rendering.
    pub fn is_mutation(&self) -> bool {
        self.set_plan.is_some() || self.toggle_display.is_some()
    }
}

/// Log to stderr; stdout belongs to the host protocol.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_plan() {
        let cli = Cli::try_parse_from(["ccm-bar", "--set-plan", "max5"]).unwrap();
        assert_eq!(cli.set_plan.as_deref(), Some("max5"));
        assert!(cli.is_mutation());
    }

    #[test]
    fn test_parse_toggle_display() {
        let cli = Cli::try_parse_from(["ccm-bar", "--toggle-display=msg"]).unwrap();
        assert_eq!(cli.toggle_display.as_deref(), Some("msg"));
        assert!(cli.is_mutation());
    }

    #[test]
    fn test_no_args_renders() {
        let cli = Cli::try_parse_from(["ccm-bar"]).unwrap();
        assert!(!cli.is_mutation());
    }

    #[test]
    fn test_both_flags_accepted() {
        let cli =
            Cli::try_parse_from(["ccm-bar", "--set-plan", "pro", "--toggle-display", "cost"])
                .unwrap();
        assert!(cli.set_plan.is_some() && cli.toggle_display.is_some());
    }

    #[test]
    fn test_unknown_flag_is_an_error_for_strict_parse() {
        assert!(Cli::try_parse_from(["ccm-bar", "--frobnicate"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
