//! High-level service facades.

mod shelf;

pub use shelf::ShelfService;
