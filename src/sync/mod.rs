//! Synchronization primitives for the task layer.

pub mod condition;

pub use condition::Condition;
