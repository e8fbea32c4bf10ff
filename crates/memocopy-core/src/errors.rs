use std::fmt;

use thiserror::Error;

/// Result type alias using CopyError
pub type Result<T> = std::result::Result<T, CopyError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a copy can surface falls into exactly one of these kinds.
/// Each kind maps to a stable code usable for programmatic handling and
/// for structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyErrorKind {
    /// A reduction descriptor or hook result had a shape the engine cannot interpret
    StructuralProtocolViolation,
    /// A container changed while it was being iterated
    ConcurrentMutation,
    /// The recursion ceiling or stack budget was reached
    RecursionExceeded,
    /// A hook rejected the engine's native memo and fallback is disabled
    MemoTypeRejected,
    /// An error raised by user code (hook, reducer, constructor, set_state)
    CustomHookFailure,
}

impl CopyErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            CopyErrorKind::StructuralProtocolViolation => "ERR_STRUCTURAL_PROTOCOL_VIOLATION",
            CopyErrorKind::ConcurrentMutation => "ERR_CONCURRENT_MUTATION",
            CopyErrorKind::RecursionExceeded => "ERR_RECURSION_EXCEEDED",
            CopyErrorKind::MemoTypeRejected => "ERR_MEMO_TYPE_REJECTED",
            CopyErrorKind::CustomHookFailure => "ERR_CUSTOM_HOOK_FAILURE",
        }
    }
}

/// Classification of an error raised by user code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookErrorKind {
    /// The hook was handed a value of a type it cannot work with
    TypeMismatch,
    /// An assertion inside the hook failed
    Assertion,
    /// Any other failure
    Failure,
}

impl fmt::Display for HookErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookErrorKind::TypeMismatch => "TypeMismatch",
            HookErrorKind::Assertion => "Assertion",
            HookErrorKind::Failure => "Failure",
        };
        f.write_str(name)
    }
}

/// Error raised by user-supplied copy code
///
/// The engine never wraps these; they reach the caller exactly as raised.
/// Type-mismatch and assertion errors raised while a hook holds a native
/// memo are what the memo compatibility shim reacts to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    kind: HookErrorKind,
    message: String,
}

impl HookError {
    pub fn new(kind: HookErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> HookErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `"<Kind>: <message>"`, the text matched by warning suppression
    pub fn identifier(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    /// Whether this error looks like a hook choking on a non-default memo
    pub fn is_memo_rejection(&self) -> bool {
        matches!(
            self.kind,
            HookErrorKind::TypeMismatch | HookErrorKind::Assertion
        )
    }
}

/// Which container a mutation was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Dict,
    Object,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerKind::List => "list",
            ContainerKind::Dict => "dict",
            ContainerKind::Object => "object state",
        })
    }
}

/// How a container was seen to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Length differs from the snapshot
    SizeChanged,
    /// Same length, but the content generation moved
    Changed,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutationKind::SizeChanged => "changed size",
            MutationKind::Changed => "changed",
        })
    }
}

/// Which ceiling stopped a deep descent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionCeiling {
    /// The configured recursion limit
    Limit { limit: usize },
    /// The stack budget measured from the outermost entry
    StackBudget { used: usize, budget: usize },
}

impl fmt::Display for RecursionCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecursionCeiling::Limit { limit } => write!(f, "recursion limit {} reached", limit),
            RecursionCeiling::StackBudget { used, budget } => write!(
                f,
                "stack budget exhausted ({} of {} bytes used)",
                used, budget
            ),
        }
    }
}

/// Precise description of a malformed reduction
///
/// Always carried as the cause of `CopyError::StructuralProtocolViolation`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMismatch {
    #[error("{type_name}.reduce must return a string or tuple, not {got}")]
    NotTupleOrString { type_name: String, got: String },

    #[error("tuple returned by {type_name}.reduce must contain 2 through 5 elements, got {len}")]
    BadArity { type_name: String, len: usize },

    #[error("first element of the tuple returned by {type_name}.reduce must be callable, not {got}")]
    NotCallable { type_name: String, got: String },

    #[error("second element of the tuple returned by {type_name}.reduce must be a tuple, not {got}")]
    ArgsNotTuple { type_name: String, got: String },

    #[error("new_obj_ex args in {type_name}.reduce result must contain 3 elements, got {len}")]
    NewObjExArity { type_name: String, len: usize },

    #[error("new_obj_ex constructor in {type_name}.reduce result must be callable, not {got}")]
    NewObjExNotCallable { type_name: String, got: String },

    #[error("new_obj_ex args in {type_name}.reduce result must be a tuple, not {got}")]
    NewObjExArgsNotTuple { type_name: String, got: String },

    #[error("new_obj_ex kwargs in {type_name}.reduce result must be a dict, not {got}")]
    NewObjExKwargsNotDict { type_name: String, got: String },

    #[error("keywords must be strings, not {got}")]
    KeywordNotString { got: String },

    #[error("dict state from {type_name}.reduce must be a dict or mapping, got {got}")]
    DictStateNotMapping { type_name: String, got: String },

    #[error("slot state from {type_name}.reduce must be a dict or have an items() method, got {got}")]
    SlotStateNotMapping { type_name: String, got: String },

    #[error("attribute name must be a string, not {got}")]
    AttrNameNotString { got: String },

    #[error("cannot apply state from {type_name}.reduce to {got}")]
    StateTargetNotObject { type_name: String, got: String },

    #[error("fourth element of the tuple returned by {type_name}.reduce must be an iterator, not {got}")]
    ListItemsNotIterable { type_name: String, got: String },

    #[error("fifth element of the tuple returned by {type_name}.reduce must be an iterator, not {got}")]
    DictItemsNotIterable { type_name: String, got: String },

    #[error("dict items from {type_name}.reduce must yield (key, value) pairs")]
    DictItemNotPair { type_name: String },

    #[error("unhashable key of type {got} in dict items from {type_name}.reduce")]
    UnhashableKey { type_name: String, got: String },

    #[error("cannot append items from {type_name}.reduce to {got}")]
    ListItemsTarget { type_name: String, got: String },

    #[error("cannot set dict items from {type_name}.reduce on {got}")]
    DictItemsTarget { type_name: String, got: String },
}

/// Every failure a copy call can surface
///
/// A failed call never returns a partial result; the memo may keep
/// entries for the sub-copies that completed.
#[derive(Error, Debug, Clone)]
pub enum CopyError {
    #[error("cannot reconstruct '{type_name}' from its reduction")]
    StructuralProtocolViolation {
        type_name: String,
        #[source]
        cause: ProtocolMismatch,
    },

    #[error("{container} {change} during iteration")]
    ConcurrentMutation {
        container: ContainerKind,
        change: MutationKind,
    },

    #[error("stack overflow (depth {depth}) while deep copying an object: {ceiling}")]
    RecursionExceeded {
        depth: usize,
        ceiling: RecursionCeiling,
    },

    #[error("'{hook}' rejected the memo it was handed")]
    MemoTypeRejected {
        hook: String,
        #[source]
        cause: HookError,
    },

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl CopyError {
    /// Get the canonical kind of this error
    pub fn kind(&self) -> CopyErrorKind {
        match self {
            CopyError::StructuralProtocolViolation { .. } => {
                CopyErrorKind::StructuralProtocolViolation
            }
            CopyError::ConcurrentMutation { .. } => CopyErrorKind::ConcurrentMutation,
            CopyError::RecursionExceeded { .. } => CopyErrorKind::RecursionExceeded,
            CopyError::MemoTypeRejected { .. } => CopyErrorKind::MemoTypeRejected,
            CopyError::Hook(_) => CopyErrorKind::CustomHookFailure,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// User code was handed a value of the wrong type
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        CopyError::Hook(HookError::new(HookErrorKind::TypeMismatch, message))
    }

    /// An assertion inside user code failed
    pub fn assertion(message: impl Into<String>) -> Self {
        CopyError::Hook(HookError::new(HookErrorKind::Assertion, message))
    }

    /// Any other failure raised by user code
    pub fn hook_failure(message: impl Into<String>) -> Self {
        CopyError::Hook(HookError::new(HookErrorKind::Failure, message))
    }

    pub(crate) fn protocol(type_name: &str, cause: ProtocolMismatch) -> Self {
        CopyError::StructuralProtocolViolation {
            type_name: type_name.to_string(),
            cause,
        }
    }

    /// The hook error, if this came straight from user code
    pub fn as_hook_error(&self) -> Option<&HookError> {
        match self {
            CopyError::Hook(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            CopyErrorKind::StructuralProtocolViolation,
            CopyErrorKind::ConcurrentMutation,
            CopyErrorKind::RecursionExceeded,
            CopyErrorKind::MemoTypeRejected,
            CopyErrorKind::CustomHookFailure,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_hook_error_is_transparent() {
        let err = CopyError::hook_failure("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.kind(), CopyErrorKind::CustomHookFailure);
    }

    #[test]
    fn test_protocol_violation_chains_cause() {
        let err = CopyError::protocol(
            "Point",
            ProtocolMismatch::ArgsNotTuple {
                type_name: "Point".to_string(),
                got: "int".to_string(),
            },
        );
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("second element of the tuple returned by Point.reduce must be a tuple, not int")
        );
    }

    #[test]
    fn test_mutation_message() {
        let err = CopyError::ConcurrentMutation {
            container: ContainerKind::Dict,
            change: MutationKind::SizeChanged,
        };
        assert_eq!(err.to_string(), "dict changed size during iteration");
    }

    #[test]
    fn test_identifier_format() {
        let err = HookError::new(HookErrorKind::TypeMismatch, "memo must be a dict");
        assert_eq!(err.identifier(), "TypeMismatch: memo must be a dict");
        assert!(err.is_memo_rejection());
        assert!(!HookError::new(HookErrorKind::Failure, "x").is_memo_rejection());
    }
}
