//! Shared building blocks for `sshsweep`.
//!
//! Everything that both the probing engine and the command line need lives
//! here: the subnet model and its address enumeration, credentials, the YAML
//! configuration and the error taxonomy.

pub mod config;
pub mod credential;
pub mod error;
pub mod log;
pub mod network;
