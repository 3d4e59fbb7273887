//! Boundary adapters: payload shapes and the batch CLI's input and output
//! formats.

pub mod csv;
pub mod json;
pub mod payloads;
