//! Error types for the hotmap core.

use thiserror::Error;

/// Errors that can occur while building a [`Hotmap`](crate::Hotmap).
///
/// Store operations themselves never fail; a missing key is reported as `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// No Tokio runtime is available to run expiration watchers
    #[error("hotmap requires a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
