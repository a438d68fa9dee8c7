//! Remote API access.
//!
//! This module provides:
//! - The [`ComputeApi`] trait the stage drivers call through
//! - A `reqwest` implementation, [`ComputeClient`]
//! - Endpoint paths and wire types

mod client;
mod endpoints;
pub mod models;

pub use client::{ApiResponse, ComputeApi, ComputeClient};
pub use endpoints::Endpoints;
