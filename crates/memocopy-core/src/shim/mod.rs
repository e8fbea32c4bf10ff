//! Memo compatibility shim
//!
//! Hooks are handed the engine's native memo. Some insist on the default
//! dict-shaped memo and fail with a type-mismatch or assertion error. When
//! that happens the hook's partial registrations are rolled back, together
//! with anything a nested fallback mirrored meanwhile, and the hook is
//! retried with a dict-flavoured mirror of the native memo, kept in
//! step with it in both directions. A diagnostic is emitted at most once
//! per top-level call.

mod diagnostic;

use std::sync::Arc;

use crate::call::CallContext;
use crate::config::FallbackScope;
use crate::engine::Engine;
use crate::errors::{CopyError, HookError, Result};
use crate::hooks::CustomCopy;
use crate::memo::{Memo, MemoFlavor};
use crate::schema;
use crate::value::{Class, Value};

use diagnostic::FallbackDiagnostic;

/// Run `hook` on `value`, falling back to a default-shaped memo if needed
pub(crate) fn invoke_hook(
    engine: &Engine,
    hook: &Arc<dyn CustomCopy>,
    class: &Class,
    value: &Value,
    memo: &Memo,
    call: &CallContext,
) -> Result<Value> {
    if memo.flavor() == MemoFlavor::Dict {
        return hook.deep_copy(engine, value, memo);
    }

    let config = engine.config();
    if call.fallback_engaged() && config.fallback_scope == FallbackScope::PerCall {
        return through_mirror(engine, hook, value, memo, call);
    }

    let checkpoint = memo.checkpoint();
    let err = match hook.deep_copy(engine, value, memo) {
        Ok(copy) => return Ok(copy),
        Err(err) => err,
    };
    let Some(rejection) = err.as_hook_error().filter(|e| e.is_memo_rejection()) else {
        return Err(err);
    };

    let hook_name = format!("{}::deep_copy", class.qualname());
    if !config.memo_fallback {
        return Err(CopyError::MemoTypeRejected {
            hook: hook_name,
            cause: rejection.clone(),
        });
    }

    if memo.is_exclusive() {
        // The mirror may hold entries the rollback drops; reopen it from
        // the rolled-back memo so both sides agree again
        memo.rollback(checkpoint);
        call.close_mirror(memo);
    }
    call.engage_fallback();
    tracing::debug!(
        component = module_path!(),
        op = "deep_copy",
        hook = %hook_name,
        error = %rejection,
        "retrying hook with a default-shaped memo"
    );

    let copy = through_mirror(engine, hook, value, memo, call)?;
    report(engine, call, class, hook_name, rejection);
    Ok(copy)
}

fn through_mirror(
    engine: &Engine,
    hook: &Arc<dyn CustomCopy>,
    value: &Value,
    native: &Memo,
    call: &CallContext,
) -> Result<Value> {
    let mirror = call.with_mirror(native, |link| {
        link.pull(native);
        link.memo().clone()
    });
    let result = hook.deep_copy(engine, value, &mirror);
    call.with_mirror(native, |link| link.push(native));
    result
}

fn report(
    engine: &Engine,
    call: &CallContext,
    class: &Class,
    hook_name: String,
    rejection: &HookError,
) {
    let identifier = rejection.identifier();
    if !engine.config().should_warn(&identifier) || !call.claim_diagnostic() {
        return;
    }

    let diagnostic = FallbackDiagnostic::capture(
        hook_name,
        identifier,
        call.location(),
        &engine.config().ignored_errors,
    );
    tracing::warn!(
        component = module_path!(),
        op = "deep_copy",
        event = schema::EVENT_MEMO_FALLBACK,
        call_id = %call.call_id(),
        hook = %diagnostic.hook,
        type_name = class.name(),
        call_site = %diagnostic.call_site,
        error_identifier = %diagnostic.error_identifier,
        "{}",
        diagnostic.render()
    );
}
