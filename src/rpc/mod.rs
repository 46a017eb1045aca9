//! JSON-RPC 2.0 wire layer: envelope codec, method registry, error
//! taxonomy, and the ordered request pipeline.

pub mod codec;
pub mod errors;
pub mod pipeline;
pub mod registry;
