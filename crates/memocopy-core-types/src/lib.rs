//! Types shared by the memocopy engine and its logging facility
//!
//! [`CallId`] ties every event of one top-level copy together; [`schema`]
//! names the fields those events carry.

pub mod correlation;
pub mod schema;

pub use correlation::CallId;
