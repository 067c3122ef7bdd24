//! Service layer for the fruits API.
//! - `fruits` holds the record type, id generation and the lock-guarded store.
//! - `storage` persists maps as a JSON snapshot file.
//! - Errors are reported as `ServiceError`; nothing here exits the process.

pub mod errors;
pub mod fruits;
pub mod storage;
