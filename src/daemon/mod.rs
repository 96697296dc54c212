//! Supervision of the external inference daemon.
//!
//! The daemon is started before a request and stopped once the response has
//! been drained. It is addressed by name, never by a retained handle.

pub mod supervisor;

pub use supervisor::{Launcher, Supervisor, SystemLauncher};
