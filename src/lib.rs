//! logmill — multi-format log ingestion with schema discovery and dashboard
//! analytics.
//!
//! The engine lives in [`logmill_core`]; line sources live in
//! [`logmill_feeds`]. This crate wires them into a [`session::Session`] for
//! the `logmill` binary and for integration tests.
//!
//! # Architecture
//!
//! ```text
//! LineFeed ──► Ingestor ──► MemoryStore ──► Search / Schema / Dashboard
//! ```

pub mod session;

pub use logmill_core as core;
pub use logmill_feeds as feeds;
pub use session::Session;
