use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Empty or whitespace only
pub fn is_empty(s: &str) -> bool {
    s.trim().is_empty()
}

/// At least `min` characters once surrounding whitespace is trimmed
pub fn min_length(s: &str, min: usize) -> bool {
    s.trim().chars().count() >= min
}

/// Check `(name, value)` pairs in order; the first blank one is reported.
pub fn validate_required(fields: &[(&str, &str)]) -> Result<(), String> {
    match fields.iter().find(|(_, value)| is_empty(value)) {
        Some((name, _)) => Err(format!("{} is required", name)),
        None => Ok(()),
    }
}

/// Check named top-level fields of an already-decoded JSON object.
///
/// Missing, `null` and blank strings fail; any other value counts as present.
pub fn check_required_fields(decoded: &Value, fields: &[&str]) -> Result<(), String> {
    for name in fields {
        let present = match decoded.get(*name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !is_empty(s),
            Some(_) => true,
        };
        if !present {
            return Err(format!("{} is required", name));
        }
    }
    Ok(())
}
