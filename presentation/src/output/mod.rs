//! Terminal output

pub mod event_writer;

pub use event_writer::write_events;
