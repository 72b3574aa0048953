//! Executor response sanitization.
//!
//! Field suggestions ("Did you mean \"user\"?") leak schema names to clients
//! that have introspection disabled; they are stripped from error messages.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn suggestion_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Did you mean "[^"]+"\?"#).expect("valid regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Remove suggestions, collapse whitespace runs and trim.
pub fn sanitize_message(message: &str) -> String {
    let stripped = suggestion_regex().replace_all(message, "");
    whitespace_regex()
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Rewrite `errors[].message` of a JSON response body.
///
/// Returns `None` when the body is not a JSON object with an `errors` array, in
/// which case it should be forwarded untouched.
pub fn sanitize_response_body(body: &[u8]) -> Option<Vec<u8>> {
    let mut data: Value = serde_json::from_slice(body).ok()?;
    let errors = data.get_mut("errors")?.as_array_mut()?;

    for error in errors.iter_mut() {
        if let Some(Value::String(message)) = error.get_mut("message") {
            *message = sanitize_message(message);
        }
    }

    serde_json::to_vec(&data).ok()
}
