//! Run a command, mirror its output live, capture it fully, and report on
//! demand.
//!
//! ```no_run
//! let cmd = vec!["echo".to_string(), "hello".to_string()];
//! let result = tailrun::run(&cmd, false, false);
//! if !result.success() {
//!     result.trace();
//! }
//! assert_eq!(result.stdout, "hello");
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod sink;
pub mod trace;

pub use config::Config;
pub use error::{ConfigError, RunError};
pub use runner::{RunResult, Runner, run};
