//! Human-readable report for an engaged memo fallback
//!
//! The report points at the user's call site. When the source file is
//! readable, the offending `deep_copy(...)` expression is lifted from it so
//! the suggested rewrite can be pasted back verbatim.

use std::fmt::Write as _;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};

const CALL_NAME: &str = "deep_copy";
const GENERIC_EXPRESSION: &str = "deep_copy(&value)";
const GENERIC_SUGGESTION: &str = "deep_copy_with(&value, &Memo::new())";

pub(crate) struct FallbackDiagnostic {
    pub(crate) hook: String,
    pub(crate) error_identifier: String,
    pub(crate) call_site: String,
    source_line: Option<String>,
    expression: String,
    suggestion: String,
    silenced: Vec<String>,
}

impl FallbackDiagnostic {
    pub(crate) fn capture(
        hook: String,
        error_identifier: String,
        location: &Location<'_>,
        already_silenced: &[String],
    ) -> Self {
        let source_line = read_source_line(location.file(), location.line());
        let (expression, suggestion) = source_line
            .as_deref()
            .and_then(extract_call_expression)
            .and_then(|expr| suggest_explicit_memo(&expr).map(|suggestion| (expr, suggestion)))
            .unwrap_or_else(|| (GENERIC_EXPRESSION.to_string(), GENERIC_SUGGESTION.to_string()));

        let mut silenced = already_silenced.to_vec();
        silenced.push(error_identifier.clone());

        Self {
            hook,
            error_identifier,
            call_site: format!(
                "{}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            source_line: source_line.map(|line| line.trim().to_string()),
            expression,
            suggestion,
            silenced,
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "the memo was rejected inside '{}':", self.hook);
        let _ = writeln!(out);
        let _ = writeln!(out, "    {}", self.error_identifier);
        let _ = writeln!(out);
        let _ = writeln!(out, "at {}:", self.call_site);
        if let Some(line) = &self.source_line {
            let _ = writeln!(out, "    {}", line);
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "the copy was retried with a default-shaped memo, which is slower."
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Fix:");
        let _ = writeln!(out);
        let _ = writeln!(out, "    '{}' should treat the memo as opaque.", self.hook);
        let _ = writeln!(out);
        let _ = writeln!(out, "Workarounds:");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "        local  change {} to {}",
            self.expression, self.suggestion
        );
        let _ = writeln!(
            out,
            "               -> '{}' uses a default-shaped memo in this call",
            self.hook
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "       global  export MEMOCOPY_USE_DICT_MEMO=1");
        let _ = writeln!(out, "               -> every call starts with a default-shaped memo");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "       silent  export MEMOCOPY_NO_MEMO_FALLBACK_WARNING='{}'",
            self.silenced.join("::")
        );
        let _ = writeln!(out, "               -> {} stays slow", self.expression);
        let _ = writeln!(out);
        let _ = writeln!(out, "    explosive  export MEMOCOPY_NO_MEMO_FALLBACK=1");
        let _ = write!(
            out,
            "               -> {} fails with the error above",
            self.expression
        );
        out
    }
}

/// Candidate paths for a `file!()`-style path, nearest first
fn candidate_paths(file: &str) -> Vec<PathBuf> {
    let path = Path::new(file);
    let mut candidates = vec![path.to_path_buf()];
    if path.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            candidates.extend(cwd.ancestors().map(|dir| dir.join(path)));
        }
    }
    candidates
}

fn read_source_line(file: &str, line: u32) -> Option<String> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    candidate_paths(file)
        .into_iter()
        .find_map(|path| fs::read_to_string(path).ok())
        .and_then(|source| source.lines().nth(index).map(str::to_string))
}

fn is_path_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b':')
}

/// Lift the first `deep_copy(...)` call, with its receiver path, out of `line`
fn extract_call_expression(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let mut search_from = 0;
    let call_start = loop {
        let found = search_from + line[search_from..].find(CALL_NAME)?;
        let after = found + CALL_NAME.len();
        let bounded_left = found == 0
            || !(bytes[found - 1].is_ascii_alphanumeric() || bytes[found - 1] == b'_');
        if bounded_left && bytes.get(after) == Some(&b'(') {
            break found;
        }
        search_from = after;
    };

    let mut begin = call_start;
    while begin > 0 && is_path_byte(bytes[begin - 1]) {
        begin -= 1;
    }

    let open = call_start + CALL_NAME.len();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in line[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(line[begin..=open + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrite `recv.deep_copy(args)` as `recv.deep_copy_with(args, &Memo::new())`
fn suggest_explicit_memo(expression: &str) -> Option<String> {
    let call_start = expression.find(CALL_NAME)?;
    let head = &expression[..call_start];
    let inner = expression
        .get(call_start + CALL_NAME.len()..)?
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let args = inner.trim().trim_end_matches(',').trim_end();
    if args.is_empty() {
        Some(format!("{head}deep_copy_with(&Memo::new())"))
    } else {
        Some(format!("{head}deep_copy_with({args}, &Memo::new())"))
    }
}
