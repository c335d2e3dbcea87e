//! Diagnostic report for a finished command.

use std::fmt;

use crate::runner::RunResult;

const BANNER_WIDTH: usize = 28;

/// Renders lazily: nothing is formatted until the report is displayed.
pub struct TraceReport<'a> {
    result: &'a RunResult,
}

impl<'a> TraceReport<'a> {
    pub fn new(result: &'a RunResult) -> Self {
        Self { result }
    }
}

impl fmt::Display for TraceReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[trace] command: {}", command_line(&self.result.argv))?;
        write!(f, "[trace] exit code: {}", self.result.exit_code)?;
        if self.result.timed_out {
            write!(f, " (timed out)")?;
        }
        write_stream(f, "stdout", &self.result.stdout)?;
        write_stream(f, "stderr", &self.result.stderr)
    }
}

fn write_stream(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    if value.is_empty() {
        return Ok(());
    }
    if !value.contains('\n') {
        return write!(f, "\n[trace] {label}: {value}");
    }
    write!(f, "\n[trace] {}", banner(label))?;
    write!(f, "\n{value}")?;
    write!(f, "\n[trace] {}", banner(&format!("end {label}")))
}

fn banner(title: &str) -> String {
    let title = format!(" {title} ");
    let fill = BANNER_WIDTH.saturating_sub(title.len());
    let left = fill / 2;
    format!("{}{title}{}", "-".repeat(left), "-".repeat(fill - left))
}

/// Format a one-line footer with timing and exit code.
pub fn footer(label: &str, result: &RunResult) -> String {
    let status = if result.success() { "ok" } else { "FAIL" };
    format!(
        "[{label}] {status} ({}ms, exit {})",
        result.elapsed_ms, result.exit_code
    )
}

/// Join an argument vector into one copy-pasteable line.
pub fn command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str, exit_code: i32) -> RunResult {
        let argv = vec!["echo".to_string(), "hello world".to_string()];
        RunResult {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            command: argv.clone(),
            argv,
            elapsed_ms: 3,
            timed_out: false,
        }
    }

    #[test]
    fn test_command_line_quotes_only_when_needed() {
        let argv: Vec<String> = ["sh", "-c", "echo hi | wc -c", "it's", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            command_line(&argv),
            r#"sh -c 'echo hi | wc -c' 'it'\''s' ''"#
        );
    }

    #[test]
    fn test_single_line_streams_inline() {
        let report = TraceReport::new(&result("hello", "warn", 0)).to_string();
        assert_eq!(
            report,
            "[trace] command: echo 'hello world'\n\
             [trace] exit code: 0\n\
             [trace] stdout: hello\n\
             [trace] stderr: warn"
        );
    }

    #[test]
    fn test_multi_line_stream_gets_banner() {
        let report = TraceReport::new(&result("", "first\nsecond", 2)).to_string();
        assert!(report.contains("[trace] exit code: 2"));
        assert!(report.contains("[trace] ---------- stderr ----------\nfirst\nsecond\n"));
        assert!(report.ends_with("[trace] -------- end stderr --------"));
        assert!(!report.contains("stdout"));
    }

    #[test]
    fn test_empty_streams_omitted() {
        let report = TraceReport::new(&result("", "", 1)).to_string();
        assert_eq!(report.lines().count(), 2);
    }

    #[test]
    fn test_timeout_is_flagged() {
        let mut r = result("", "", 124);
        r.timed_out = true;
        let report = TraceReport::new(&r).to_string();
        assert!(report.contains("exit code: 124 (timed out)"));
    }

    #[test]
    fn test_footer() {
        assert_eq!(footer("run", &result("", "", 0)), "[run] ok (3ms, exit 0)");
        assert_eq!(footer("run", &result("", "", 2)), "[run] FAIL (3ms, exit 2)");
    }

    #[test]
    fn test_banner_width() {
        assert_eq!(banner("stdout").len(), BANNER_WIDTH);
        assert_eq!(banner("end stdout").len(), BANNER_WIDTH);
    }
}
