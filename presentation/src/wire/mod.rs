//! Wire protocol for the event stream

pub mod encoder;

pub use encoder::{EventEncoder, FRAME_PREFIX, FRAME_TERMINATOR};
