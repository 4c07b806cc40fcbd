//! Seams defined in `deployhub-core` and implemented by other crates.

pub mod queue;
pub mod storage;

pub use queue::TaskQueue;
pub use storage::ByteStream;
