mod cli;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands};
use tailrun::config::{self, Config};
use tailrun::trace::footer;
use tailrun::{RunResult, Runner};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = Config::load();

    match cli.command {
        Commands::Info => {
            print_info(&cfg);
            ExitCode::SUCCESS
        }
        Commands::Init { global } => match config::create_config(global) {
            Ok(path) => {
                println!("[tailrun] created {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("[tailrun] error: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Run {
            live,
            shell,
            trace,
            poll_ms,
            timeout,
            args,
        } => {
            let mut runner = Runner::from_config(&cfg);
            if let Some(ms) = poll_ms {
                runner = runner.with_poll_interval(Duration::from_millis(ms));
            }
            if let Some(secs) = timeout {
                runner = runner.with_timeout(Duration::from_secs(secs));
            }

            let live = live || cfg.live;
            let result = runner.run(&args, live, shell || cfg.shell);
            report(&result, live, trace, &cfg);
            ExitCode::from(exit_byte(result.exit_code))
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tailrun=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TAILRUN_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report(result: &RunResult, live: bool, trace: bool, cfg: &Config) {
    // Live mode already put everything on the console.
    if !live {
        if !result.stdout.is_empty() {
            println!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
    }
    if trace || (cfg.trace_on_failure && !result.success()) {
        result.trace();
    }
    if cfg.show_footer {
        eprintln!("{}", footer("run", result));
    }
}

/// Exit statuses outside 0..=255 (-1, Windows NTSTATUS values) become 1.
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn print_info(cfg: &Config) {
    println!("[tailrun info]");
    println!("  version: {}", env!("CARGO_PKG_VERSION"));
    match config::global_config_path() {
        Some(path) => println!("  global config: {}", path.display()),
        None => println!("  global config: (no config dir)"),
    }
    println!("  project config: {}", config::PROJECT_FILE);
    println!("  poll_interval_ms: {}", cfg.poll_interval_ms);
    println!("  live: {}", cfg.live);
    println!("  shell: {}", cfg.shell);
    println!("  trace_on_failure: {}", cfg.trace_on_failure);
    println!("  show_footer: {}", cfg.show_footer);
    match cfg.timeout_secs {
        Some(secs) => println!("  timeout_secs: {secs}"),
        None => println!("  timeout_secs: (none)"),
    }
    match &cfg.temp_dir {
        Some(dir) => println!("  temp_dir: {}", dir.display()),
        None => println!("  temp_dir: {}", std::env::temp_dir().display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_byte_in_range() {
        assert_eq!(exit_byte(0), 0);
        assert_eq!(exit_byte(3), 3);
        assert_eq!(exit_byte(137), 137);
    }

    #[test]
    fn test_exit_byte_out_of_range() {
        assert_eq!(exit_byte(-1), 1);
        assert_eq!(exit_byte(300), 1);
    }
}
