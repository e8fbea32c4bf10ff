#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use memocopy_core::config::{ENV_PREFIX, DEFAULT_STACK_BUDGET};
use memocopy_core::{ConfigError, CopyConfig, FallbackScope};

fn config_from(vars: &[(&str, &str)]) -> Result<CopyConfig, ConfigError> {
    let source: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    CopyConfig::from_environment(config::Environment::with_prefix(ENV_PREFIX).source(Some(source)))
}

#[test]
fn test_empty_environment_gives_defaults() {
    let config = config_from(&[]).expect("Should load");
    assert_eq!(config, CopyConfig::default());
}

#[test]
fn test_fallback_can_be_disabled() {
    // GIVEN the opt-out variable set to any non-empty value
    let config = config_from(&[("MEMOCOPY_NO_MEMO_FALLBACK", "1")]).expect("Should load");

    // THEN the fallback is off but warnings keep their default
    assert!(!config.memo_fallback);
    assert!(config.warn_on_fallback);
}

#[test]
fn test_star_silences_every_diagnostic() {
    let config =
        config_from(&[("MEMOCOPY_NO_MEMO_FALLBACK_WARNING", "*")]).expect("Should load");

    assert!(!config.warn_on_fallback);
    assert!(!config.should_warn("TypeMismatch: memo must be a dict"));
}

#[test]
fn test_warning_list_silences_matching_identifiers() {
    let config = config_from(&[(
        "MEMOCOPY_NO_MEMO_FALLBACK_WARNING",
        "TypeMismatch: memo must be a dict::Assertion: expected a dict memo",
    )])
    .expect("Should load");

    assert!(!config.should_warn("TypeMismatch: memo must be a dict"));
    assert!(!config.should_warn("Assertion: expected a dict memo"));
    assert!(config.should_warn("TypeMismatch: other"));
}

#[test]
fn test_dict_memo_and_scope() {
    let config = config_from(&[
        ("MEMOCOPY_USE_DICT_MEMO", "yes"),
        ("MEMOCOPY_FALLBACK_SCOPE", "per_invocation"),
    ])
    .expect("Should load");

    assert!(config.use_dict_memo);
    assert_eq!(config.fallback_scope, FallbackScope::PerInvocation);
}

#[test]
fn test_numeric_limits() {
    let config = config_from(&[
        ("MEMOCOPY_RECURSION_LIMIT", "500"),
        ("MEMOCOPY_STACK_BUDGET_KIB", "256"),
    ])
    .expect("Should load");

    assert_eq!(config.recursion_limit, 500);
    assert_eq!(config.stack_budget, 256 * 1024);
    assert_ne!(config.stack_budget, DEFAULT_STACK_BUDGET);
}

#[test]
fn test_unknown_scope_is_rejected() {
    let err = config_from(&[("MEMOCOPY_FALLBACK_SCOPE", "forever")])
        .expect_err("Should reject");

    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "MEMOCOPY_FALLBACK_SCOPE",
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "invalid value for MEMOCOPY_FALLBACK_SCOPE: \"forever\""
    );
}

#[test]
fn test_zero_stack_budget_is_rejected() {
    let err = config_from(&[("MEMOCOPY_STACK_BUDGET_KIB", "0")]).expect_err("Should reject");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}
