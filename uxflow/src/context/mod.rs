//! Per-run execution context.
//!
//! Every orchestration run owns one [`RunContext`]. Stage drivers receive it
//! by reference, so concurrent runs never share mutable state.

mod run;

pub use run::RunContext;
