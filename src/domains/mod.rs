//! Domain modules.
//!
//! - **tools**: tools that clients can invoke once a session is ready

pub mod tools;
