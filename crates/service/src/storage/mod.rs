//! Storage helpers for the service layer
//!
//! The store itself lives in memory; this module only moves whole maps
//! between memory and a JSON snapshot file.

pub mod json_snapshot;

pub use json_snapshot::JsonSnapshot;
