//! Guards that keep a copy from crashing or silently producing garbage
//!
//! - [`recursion`]: bounds descent depth and real stack use per thread
//! - [`mutation`]: detects containers changing while they are iterated

pub(crate) mod mutation;
pub(crate) mod recursion;

pub(crate) use mutation::MutationGuard;
pub(crate) use recursion::{DepthGuard, RecursionLimits};
