//! Operation boundary macros
//!
//! Every boundary event carries `component`, `op` and `event`. Starts and
//! ends are `debug` since copies sit on hot paths; failures are `warn` and
//! add the error's kind, code and message.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:expr, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $event
            $(, $($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use memocopy_core::log_op_start;
/// log_op_start!("deep_copy");
/// log_op_start!("replicate", copies = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            tracing::Level::DEBUG,
            $op,
            $crate::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation, with its duration
///
/// ```
/// # use memocopy_core::log_op_end;
/// log_op_end!("deep_copy", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            tracing::Level::DEBUG,
            $op,
            $crate::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation with the error's kind and stable code
///
/// ```
/// # use memocopy_core::{log_op_error, CopyError};
/// let err = CopyError::hook_failure("boom");
/// log_op_error!("deep_copy", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure = &$err;
        let kind = failure.kind();
        $crate::__log_op_event!(
            tracing::Level::WARN,
            $op,
            $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?kind,
            err.code = kind.code(),
            error = %failure
            $(, $($field)*)?
        )
    }};
}
