//! Provider session streaming primitives

pub mod stream;
