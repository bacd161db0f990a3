//! Host-facing search bridge: wire contract and stdin/stdout transport.

pub mod contract;
pub mod stdio;
