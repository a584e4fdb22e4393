//! Field checks applied before anything is persisted.
//!
//! Each check returns the normalized value on success, or a
//! [`ValidationError`] whose message is shown to the client as-is.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::ValidationError;

use crate::{errors::AppError, store::Store};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 120;
pub const NAME_MAX_LENGTH: usize = 100;
pub const EMAIL_MAX_LENGTH: usize = 255;
pub const URL_MAX_LENGTH: usize = 255;

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn too_long(max: usize) -> ValidationError {
    invalid(
        "max_length",
        format!("Ensure this field has no more than {max} characters."),
    )
}

/// Python-style type name, matching the wording clients already see
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Text of a string field
pub fn text(value: &Value) -> Result<&str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| invalid("invalid", "Not a valid string."))
}

pub fn required() -> ValidationError {
    invalid("required", "This field is required.")
}

pub fn email_taken() -> ValidationError {
    invalid("unique", "A user with this email already exists.")
}

pub fn profile_exists() -> ValidationError {
    invalid("unique", "profile with this user already exists.")
}

/// Trimmed name of 2 to 100 characters
pub fn validate_name(value: &Value) -> Result<String, ValidationError> {
    let Some(value) = value.as_str() else {
        return Err(invalid("type", "Name must be a string."));
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(
            "blank",
            "Name cannot be empty or contain only whitespace.",
        ));
    }
    if trimmed.chars().count() < 2 {
        return Err(invalid(
            "min_length",
            "Name must be at least 2 characters long.",
        ));
    }
    if trimmed.chars().count() > NAME_MAX_LENGTH {
        return Err(too_long(NAME_MAX_LENGTH));
    }
    Ok(trimmed.to_string())
}

/// Shape check only; see [`validate_email`] for uniqueness
pub fn validate_email_format(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("blank", "Email cannot be empty."));
    }
    if value.chars().count() > EMAIL_MAX_LENGTH {
        return Err(too_long(EMAIL_MAX_LENGTH));
    }
    if !EMAIL_PATTERN.is_match(value) {
        return Err(invalid("invalid", "Enter a valid email address."));
    }
    Ok(())
}

/// Well-formed and not held by any user other than `current`; returns the
/// lower-cased address.
pub async fn validate_email(
    store: &dyn Store,
    value: &Value,
    current: Option<Uuid>,
) -> Result<Result<String, ValidationError>, AppError> {
    let value = match text(value) {
        Ok(value) => value,
        Err(e) => return Ok(Err(e)),
    };
    if let Err(e) = validate_email_format(value) {
        return Ok(Err(e));
    }
    if store.email_taken(value, current).await? {
        return Ok(Err(email_taken()));
    }
    Ok(Ok(value.to_lowercase()))
}

/// `null` passes through; anything else must be an integer in 1..=120.
///
/// Integral floats (`30.0`) and numeric strings (`"30"`) are accepted.
pub fn validate_age(value: Option<&Value>) -> Result<Option<i32>, ValidationError> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    let Some(age) = number else {
        return Err(invalid("type", "Age must be a numerical value."));
    };
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(invalid("range", "Age must be between 1 and 120."));
    }
    Ok(Some(age as i32))
}

/// Empty, or starting with `http://` / `https://`
pub fn validate_profile_picture_url(value: &Value) -> Result<String, ValidationError> {
    let value = text(value)?;
    if value.chars().count() > URL_MAX_LENGTH {
        return Err(too_long(URL_MAX_LENGTH));
    }
    if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(invalid(
            "scheme",
            "Profile picture URL must start with http:// or https://",
        ));
    }
    Ok(value.to_string())
}

/// Any JSON object; the keys and values are not inspected
pub fn validate_social_links(value: &Value) -> Result<Map<String, Value>, ValidationError> {
    match value {
        Value::Object(links) => Ok(links.clone()),
        other => Err(invalid(
            "not_a_dict",
            format!(
                "Expected a dictionary of items but got type \"{}\".",
                json_type(other)
            ),
        )),
    }
}

/// Resolve a profile's `user` reference to an id; existence is checked by the caller
pub fn parse_user_ref(value: &Value) -> Result<Uuid, ValidationError> {
    match value {
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| missing_user(s)),
        other => Err(invalid(
            "incorrect_type",
            format!(
                "Incorrect type. Expected pk value, received {}.",
                json_type(other)
            ),
        )),
    }
}

pub fn missing_user(pk: &str) -> ValidationError {
    invalid(
        "does_not_exist",
        format!("Invalid pk \"{pk}\" - object does not exist."),
    )
}
