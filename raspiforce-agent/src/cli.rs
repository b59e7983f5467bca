//! Command-line surface: two order-independent mode flags

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "raspiforce-agent",
    version,
    about = "Polls a temperature sensor and files a Salesforce case when it runs hot"
)]
pub struct Cli {
    /// Skip the physical sensor and file a single case immediately
    #[arg(long)]
    pub simulation: bool,

    /// Mirror status messages to the WebSocket chat channel
    #[arg(long)]
    pub chat: bool,
}

/// Operating mode resolved from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    pub simulation: bool,
    pub chat: bool,
}

impl From<Cli> for RunMode {
    fn from(cli: Cli) -> Self {
        Self {
            simulation: cli.simulation,
            chat: cli.chat,
        }
    }
}

impl RunMode {
    /// Startup banner lines
    pub fn banner(&self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.chat {
            lines.push("Program is running in chat mode...");
        }
        if self.simulation {
            lines.push("Program is running in simulation mode...");
        } else {
            lines.push("Program is running");
            lines.push("Please press Ctrl+C to end the program...");
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(args: &[&str]) -> Result<RunMode, clap::Error> {
        let argv = std::iter::once("raspiforce-agent").chain(args.iter().copied());
        Cli::try_parse_from(argv).map(RunMode::from)
    }

    #[test]
    fn test_no_flags() {
        assert_eq!(mode(&[]).unwrap(), RunMode::default());
    }

    #[test]
    fn test_flags_order_independent() {
        let expected = RunMode {
            simulation: true,
            chat: true,
        };
        assert_eq!(mode(&["--simulation", "--chat"]).unwrap(), expected);
        assert_eq!(mode(&["--chat", "--simulation"]).unwrap(), expected);
    }

    #[test]
    fn test_single_flags() {
        assert!(mode(&["--simulation"]).unwrap().simulation);
        assert!(!mode(&["--simulation"]).unwrap().chat);
        assert!(mode(&["--chat"]).unwrap().chat);
    }

    #[test]
    fn test_unknown_input_rejected() {
        assert!(mode(&["--verbose"]).is_err());
        assert!(mode(&["simulation"]).is_err());
    }

    #[test]
    fn test_banner() {
        let banner = RunMode {
            simulation: true,
            chat: true,
        }
        .banner();
        assert_eq!(
            banner,
            vec![
                "Program is running in chat mode...",
                "Program is running in simulation mode..."
            ]
        );
        assert_eq!(RunMode::default().banner().len(), 2);
    }
}
