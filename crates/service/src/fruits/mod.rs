//! Fruit records and the in-memory store that serves them.

pub mod id;
pub mod model;
pub mod store;

pub use id::generate_id;
pub use model::Fruit;
pub use store::FruitStore;
