//! Work queue implementations.

pub mod memory;

pub use memory::FifoQueue;
