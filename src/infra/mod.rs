//! Infrastructure adapters backing the scheduler's shared structures.

pub mod queue;
