//! # Hotmap Core
//!
//! An in-memory key-value store where every value can be read only once.
//!
//! ## Features
//!
//! - Thread-safe storage using `DashMap`
//! - Single-use reads: `get` returns the value and deletes the entry
//! - One expiration watcher task per entry, stopped early by `get`, `delete`,
//!   an overwriting `set` or `close`
//! - Default TTL adjustable at runtime, applied to subsequent `set` calls
//!
//! ## Example
//!
//! ```rust,no_run
//! use hotmap_core::{Hotmap, HotmapConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create a hotmap with the default TTL (30 seconds)
//!     let hotmap = Hotmap::new();
//!
//!     // Or with a custom default TTL
//!     let config = HotmapConfig::default()
//!         .with_default_ttl(Duration::from_secs(5));
//!     let hotmap = Hotmap::with_config(config);
//!
//!     hotmap.set("session:42", "one-time-code");
//!
//!     // The first read consumes the entry
//!     assert_eq!(hotmap.get("session:42").as_deref(), Some("one-time-code"));
//!     assert_eq!(hotmap.get("session:42"), None);
//!
//!     // Stop all watchers and drop all entries
//!     hotmap.close();
//! }
//! ```

mod config;
mod entry;
mod error;
mod store;
mod watcher;

pub use config::{HotmapConfig, DEFAULT_TTL};
pub use error::Error;
pub use store::Hotmap;
