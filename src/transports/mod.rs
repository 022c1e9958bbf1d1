//! Transport implementations

pub mod scripted;
pub mod serial;

pub use scripted::ScriptedTransport;
pub use serial::SerialTransport;
