//! Structured events emitted by the engine
//!
//! The engine never installs a subscriber on its own. Applications that
//! have none call [`init`] once at startup; tests call
//! [`init_test_capture`] and assert on what was recorded.
//!
//! Outermost copy calls log a `start` and an `end` (or `end_error`) event
//! through [`log_op_start!`](crate::log_op_start),
//! [`log_op_end!`](crate::log_op_end) and
//! [`log_op_error!`](crate::log_op_error). Field and event names come from
//! [`crate::schema`].
//!
//! ```rust
//! use memocopy_core::logging_facility::{init, Profile};
//!
//! init(Profile::Production);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
