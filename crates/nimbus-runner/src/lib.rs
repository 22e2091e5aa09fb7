//! Argv-only, timeout-bounded process execution.

mod command_spec;
mod error;
mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
