//! Observability utilities.
//!
//! - [`init_logging`]: installs the `tracing` subscriber used by binaries
//! - [`SpanTimer`]: wall-clock timing of stages and runs
//! - [`stage_payload`] and [`run_payload`]: lifecycle event payloads

mod logging;
mod timing;
mod wide_events;

pub use logging::{init_logging, LogFormat};
pub use timing::SpanTimer;
pub use wide_events::{run_payload, stage_payload};
