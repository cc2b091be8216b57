//! Shared foundation for the Velella interval-index crates.
//!
//! `velella-core` provides the pieces the index crates build on:
//!
//! - **Error types** — [`VelellaError`] and [`Result`] for structured error handling
//! - **Traits** — [`Coordinate`] for position types, [`Spanning`] for interval
//!   payloads, [`Summarizable`] for one-line summaries

pub mod error;
pub mod traits;

pub use error::{Result, VelellaError};
pub use traits::*;
