//! Field keys and event names shared by the engine's structured events
//!
//! The engine, the `log_op_*` macros and the test capture all refer to
//! fields through these names.

/// Module path of the emitting code
pub const FIELD_COMPONENT: &str = "component";
/// Engine operation: `deep_copy`, `replicate`
pub const FIELD_OP: &str = "op";
/// One of the `EVENT_*` names below
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
/// [`crate::CallId`] of the top-level call
pub const FIELD_CALL_ID: &str = "call_id";

/// Qualified name of the hook that rejected the native memo
pub const FIELD_HOOK: &str = "hook";
pub const FIELD_TYPE_NAME: &str = "type_name";
/// `file:line:column` of the user's outermost copy call
pub const FIELD_CALL_SITE: &str = "call_site";
/// `"<Kind>: <message>"` of the rejection, as matched by warning suppression
pub const FIELD_ERROR_IDENTIFIER: &str = "error_identifier";
/// Number of copies a `replicate` produced
pub const FIELD_COPIES: &str = "copies";

pub const FIELD_ERR_KIND: &str = "err.kind";
/// Stable `ERR_*` code of a failed operation
pub const FIELD_ERR_CODE: &str = "err.code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
/// A hook was retried with a default-shaped memo
pub const EVENT_MEMO_FALLBACK: &str = "memo_fallback";
