//! The probing engine behind `sshsweep`.
//!
//! * [`probe`] attempts one authenticated SSH login and classifies the result.
//! * [`scanner`] fans probes out over a subnet under a concurrency limit and
//!   gathers the hosts that let us in.

pub mod probe;
pub mod scanner;
