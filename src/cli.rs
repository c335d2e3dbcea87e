use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tailrun",
    version,
    about = "Run a command, mirror it live, capture it fully, trace it on demand"
)]
pub struct Cli {
    /// Log runner internals (overridden by TAILRUN_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command and capture its output
    Run {
        /// Mirror output to the console while the command runs
        #[arg(short, long)]
        live: bool,

        /// Hand the command to the shell (sh -c / cmd /C)
        #[arg(short, long)]
        shell: bool,

        /// Always print the trace report, even on success
        #[arg(short, long)]
        trace: bool,

        /// Milliseconds between output drains
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,

        /// Kill the command after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Show the effective configuration
    Info,

    /// Generate a default .tailrun.toml config file
    Init {
        /// Generate in ~/.config/tailrun/ instead of current directory
        #[arg(long)]
        global: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "tailrun", "run", "--live", "--poll-ms", "50", "--", "ls", "-la",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                live,
                shell,
                trace,
                poll_ms,
                timeout,
                args,
            } => {
                assert!(live);
                assert!(!shell);
                assert!(!trace);
                assert_eq!(poll_ms, Some(50));
                assert_eq!(timeout, None);
                assert_eq!(args, vec!["ls", "-la"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_child_flags_are_not_ours() {
        let cli = Cli::try_parse_from(["tailrun", "run", "grep", "-v", "--live", "x"]).unwrap();
        match cli.command {
            Commands::Run { live, args, .. } => {
                assert!(!live);
                assert_eq!(args, vec!["grep", "-v", "--live", "x"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_command() {
        assert!(Cli::try_parse_from(["tailrun", "run"]).is_err());
    }

    #[test]
    fn test_global_verbose() {
        let cli = Cli::try_parse_from(["tailrun", "info", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_init_global() {
        let cli = Cli::try_parse_from(["tailrun", "init", "--global"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { global: true }));
    }
}
