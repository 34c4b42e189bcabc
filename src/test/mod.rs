//! Shared test fixtures.


pub use engine::*;
