//! Research workflow
//!
//! - [`decide`] picks the next agent from the transcript alone
//! - [`Coordinator`] drives the sequential hand-off loop for one run
//! - [`SessionController`] holds one browser session's state and exposes
//!   start-run, progress and download-report
//! - [`SessionManager`] keeps the controllers of all live sessions

pub mod coordinator;
pub mod handoff;
pub mod session;

pub use coordinator::{Coordinator, NoOpObserver, RunObserver, validate_topic};
pub use handoff::{HandOff, decide, progress_for};
pub use session::{
    ReportDownload, RunStatus, SessionController, SessionManager, SessionState,
};
