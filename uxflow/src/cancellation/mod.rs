//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is shared between the caller of a run and every
//! stage of that run. Raising it stops polling and short-circuits the
//! pipeline with a `Cancelled` outcome.

mod token;

pub use token::CancellationToken;
