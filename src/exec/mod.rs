// src/exec/mod.rs

//! Process execution layer.
//!
//! One call to [`Executor::execute`] supervises one child process:
//!
//! - [`process`] owns the OS process and carries out destruction requests.
//! - [`watchdog`] is the deadline timer that requests destruction.
//! - [`pump`] copies one child stream to or from a caller endpoint.
//! - [`router`] wires stdio and starts/joins the pumps for one child.
//! - [`streams`] describes the caller's endpoints (`StreamConfig`).
//! - [`outcome`] holds result types and the success policy.
//! - [`supervisor`] ties the above together.

pub mod outcome;
pub mod process;
pub mod pump;
pub mod router;
pub mod streams;
pub mod supervisor;
pub mod watchdog;

pub use outcome::{classify, ExecutionReport, ExecutionResult, Outcome, StreamIoWarning, StreamKind};
pub use process::{Destroyer, ProcessHandle};
pub use router::{DrainReport, StreamRouter};
pub use streams::{InputSource, OutputSink, SharedBuffer, StreamConfig};
pub use supervisor::Executor;
pub use watchdog::{Watchdog, WatchdogState};
