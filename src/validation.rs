//! Contact-form and demo-call input validation.
//!
//! Validators operate on the raw JSON body: string fields are trimmed and
//! HTML-escaped before the rules run, all violations are collected in one
//! pass, and unknown fields are dropped silently.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use lettre::Address;
use regex::Regex;
use serde_json::Value;

use crate::db::models::CallOutcome;
use crate::error::FieldError;

/// Accepted UK mobile notations: optionally parenthesized "07" prefix or
/// "+44 7" prefix, 3+3+3 digit groups, optional internal whitespace.
static UK_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+44\s?7\d{3}|\(?07\d{3}\)?)\s?\d{3}\s?\d{3}$")
        .expect("UK phone regex is valid")
});

/// Sanitized, validated contact-form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactData {
    pub name: String,
    pub email: String,
    pub restaurant: String,
    pub phone: String,
    pub trial: bool,
    pub consent_given: bool,
}

/// Sanitized, validated demo-call data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoCallData {
    pub phone: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<i32>,
    pub outcome: Option<CallOutcome>,
}

/// Trim and escape HTML-significant characters in user input.
///
/// Sanitized values are what get persisted, so stored data is never
/// executable when echoed back into HTML contexts.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Normalize an already-validated UK phone number to international form.
///
/// Strips spaces, parentheses, and hyphens; a leading "0" becomes "+44".
/// The upstream pattern check guarantees shape, so there is no failure path.
pub fn normalize_phone(phone: &str) -> String {
    let stripped: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '-') && !c.is_whitespace())
        .collect();

    match stripped.strip_prefix('0') {
        Some(rest) => format!("+44{rest}"),
        None => stripped,
    }
}

fn is_valid_email(email: &str) -> bool {
    email.parse::<Address>().is_ok()
}

fn is_valid_phone(phone: &str) -> bool {
    UK_PHONE_RE.is_match(phone)
}

/// Pull a sanitized string field out of the body, recording violations.
fn string_field(
    body: &Value,
    field: &'static str,
    label: &str,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, format!("{label} is required")));
            None
        }
        Some(Value::String(raw)) => {
            let value = sanitize(raw);
            if value.is_empty() {
                errors.push(FieldError::new(field, format!("{label} is required")));
                None
            } else if value.chars().count() < min {
                errors.push(FieldError::new(
                    field,
                    format!("{label} must be at least {min} characters long"),
                ));
                None
            } else if value.chars().count() > max {
                errors.push(FieldError::new(
                    field,
                    format!("{label} cannot exceed {max} characters"),
                ));
                None
            } else {
                Some(value)
            }
        }
        Some(_) => {
            errors.push(FieldError::new(field, format!("{label} must be a string")));
            None
        }
    }
}

fn bool_field(
    body: &Value,
    field: &'static str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> bool {
    match body.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            errors.push(FieldError::new(
                field,
                format!("{label} field must be a boolean value"),
            ));
            false
        }
    }
}

fn phone_field(
    body: &Value,
    hint: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match body.get("phone") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("phone", "Phone number is required"));
            None
        }
        Some(Value::String(raw)) => {
            let value = sanitize(raw);
            if value.is_empty() {
                errors.push(FieldError::new("phone", "Phone number is required"));
                None
            } else if is_valid_phone(&value) {
                Some(value)
            } else {
                errors.push(FieldError::new(
                    "phone",
                    format!("Please enter a valid UK phone number{hint}"),
                ));
                None
            }
        }
        Some(_) => {
            errors.push(FieldError::new("phone", "Phone number must be a string"));
            None
        }
    }
}

/// Validate and sanitize a contact-form body.
///
/// All violations are collected in one pass; unknown fields are ignored.
pub fn validate_contact(body: &Value) -> Result<ContactData, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = string_field(body, "name", "Name", 2, 100, &mut errors);
    let restaurant = string_field(body, "restaurant", "Restaurant name", 2, 200, &mut errors);

    let email = match body.get("email") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("email", "Email is required"));
            None
        }
        Some(Value::String(raw)) => {
            let value = sanitize(raw);
            if value.is_empty() {
                errors.push(FieldError::new("email", "Email is required"));
                None
            } else if is_valid_email(&value) {
                Some(value)
            } else {
                errors.push(FieldError::new(
                    "email",
                    "Please enter a valid email address",
                ));
                None
            }
        }
        Some(_) => {
            errors.push(FieldError::new("email", "Email must be a string"));
            None
        }
    };

    let phone = phone_field(body, " (e.g., 07123 456789 or +44 7123 456789)", &mut errors);

    let trial = bool_field(body, "trial", "Trial", &mut errors);
    let consent_given = bool_field(body, "consent_given", "Consent", &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    // Unwraps cannot fire: every None pushed an error above.
    match (name, email, restaurant, phone) {
        (Some(name), Some(email), Some(restaurant), Some(phone)) => Ok(ContactData {
            name,
            email,
            restaurant,
            phone,
            trial,
            consent_given,
        }),
        _ => Err(vec![FieldError::new("body", "Validation failed")]),
    }
}

/// Validate a demo-call tracking body.
pub fn validate_demo_call(body: &Value) -> Result<DemoCallData, Vec<FieldError>> {
    let mut errors = Vec::new();

    let phone = phone_field(body, "", &mut errors);

    let timestamp = match body.get("timestamp") {
        None | Some(Value::Null) => Some(Utc::now()),
        Some(Value::String(raw)) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(_) => {
                errors.push(FieldError::new(
                    "timestamp",
                    "Timestamp must be in ISO format",
                ));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new(
                "timestamp",
                "Timestamp must be a valid date",
            ));
            None
        }
    };

    let duration = match body.get("duration") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(secs) if secs < 0 => {
                errors.push(FieldError::new("duration", "Duration cannot be negative"));
                None
            }
            Some(secs) if secs > 3600 => {
                errors.push(FieldError::new(
                    "duration",
                    "Duration cannot exceed 3600 seconds (1 hour)",
                ));
                None
            }
            Some(secs) => Some(secs as i32),
            None => {
                errors.push(FieldError::new("duration", "Duration must be an integer"));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new("duration", "Duration must be a number"));
            None
        }
    };

    let outcome = match body.get("outcome") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => match sanitize(raw).parse::<CallOutcome>() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                errors.push(FieldError::new(
                    "outcome",
                    "Outcome must be one of: interested, not_interested, callback_requested",
                ));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new("outcome", "Outcome must be a string"));
            None
        }
    };

    match (phone, timestamp) {
        (Some(phone), Some(timestamp)) if errors.is_empty() => Ok(DemoCallData {
            phone,
            timestamp,
            duration,
            outcome,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "name": "Mario Rossi",
            "email": "mario@pizzaroma.co.uk",
            "restaurant": "Pizza Roma",
            "phone": "07123 456789",
            "trial": true,
            "consent_given": true
        })
    }

    #[test]
    fn accepts_valid_contact() {
        let data = validate_contact(&valid_body()).expect("valid body");
        assert_eq!(data.name, "Mario Rossi");
        assert_eq!(data.phone, "07123 456789");
        assert!(data.trial);
        assert!(data.consent_given);
    }

    #[test]
    fn missing_fields_yield_one_error_each() {
        let errors = validate_contact(&json!({})).expect_err("empty body");
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "restaurant", "email", "phone"]);
        assert!(errors.iter().any(|e| e.message == "Name is required"));
        assert!(errors.iter().any(|e| e.message == "Email is required"));
    }

    #[test]
    fn collects_all_errors_without_short_circuit() {
        let body = json!({
            "name": "M",
            "email": "not-an-email",
            "restaurant": "X",
            "phone": "12345"
        });
        let errors = validate_contact(&body).expect_err("invalid body");
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn booleans_default_to_false() {
        let mut body = valid_body();
        body.as_object_mut().expect("object").remove("trial");
        body.as_object_mut().expect("object").remove("consent_given");
        let data = validate_contact(&body).expect("valid body");
        assert!(!data.trial);
        assert!(!data.consent_given);
    }

    #[test]
    fn non_boolean_trial_rejected() {
        let mut body = valid_body();
        body["trial"] = json!("yes");
        let errors = validate_contact(&body).expect_err("bad trial");
        assert_eq!(errors[0].field, "trial");
        assert_eq!(errors[0].message, "Trial field must be a boolean value");
    }

    #[test]
    fn unknown_fields_dropped_silently() {
        let mut body = valid_body();
        body["unexpected"] = json!("whatever");
        assert!(validate_contact(&body).is_ok());
    }

    #[test]
    fn script_tags_are_escaped() {
        let mut body = valid_body();
        body["name"] = json!("<script>alert(1)</script>ok");
        let data = validate_contact(&body).expect("escaped name still valid length");
        assert!(!data.name.contains('<'));
        assert!(data.name.contains("&lt;script&gt;"));
    }

    #[test]
    fn name_length_bounds_enforced() {
        let mut body = valid_body();
        body["name"] = json!("A");
        let errors = validate_contact(&body).expect_err("too short");
        assert_eq!(
            errors[0].message,
            "Name must be at least 2 characters long"
        );

        let mut body = valid_body();
        body["name"] = json!("x".repeat(101));
        let errors = validate_contact(&body).expect_err("too long");
        assert_eq!(errors[0].message, "Name cannot exceed 100 characters");
    }

    #[test]
    fn phone_pattern_matrix() {
        for good in [
            "07123456789",
            "07123 456789",
            "07123 456 789",
            "(07123) 456 789",
            "+447123456789",
            "+44 7123 456789",
            "+44 7123 456 789",
        ] {
            assert!(is_valid_phone(good), "expected valid: {good}");
        }
        for bad in [
            "06123456789",
            "+44 6123 456789",
            "0712345678",
            "071234567890",
            "phone",
            "+1 555 123 4567",
        ] {
            assert!(!is_valid_phone(bad), "expected invalid: {bad}");
        }
    }

    #[test]
    fn normalize_rewrites_leading_zero() {
        assert_eq!(normalize_phone("07123456789"), "+447123456789");
        assert_eq!(normalize_phone("07123 456789"), "+447123456789");
        assert_eq!(normalize_phone("(07123) 456-789"), "+447123456789");
    }

    #[test]
    fn normalize_is_idempotent_up_to_whitespace() {
        assert_eq!(normalize_phone("+44 7123 456789"), "+447123456789");
        assert_eq!(normalize_phone("+447123456789"), "+447123456789");
    }

    #[test]
    fn demo_call_defaults_timestamp() {
        let data =
            validate_demo_call(&json!({ "phone": "07123 456789" })).expect("valid demo call");
        assert!((Utc::now() - data.timestamp).num_seconds() < 5);
        assert!(data.duration.is_none());
        assert!(data.outcome.is_none());
    }

    #[test]
    fn demo_call_duration_bounds() {
        let errors = validate_demo_call(&json!({ "phone": "07123 456789", "duration": -1 }))
            .expect_err("negative duration");
        assert_eq!(errors[0].message, "Duration cannot be negative");

        let errors = validate_demo_call(&json!({ "phone": "07123 456789", "duration": 3601 }))
            .expect_err("too long");
        assert_eq!(
            errors[0].message,
            "Duration cannot exceed 3600 seconds (1 hour)"
        );

        let data = validate_demo_call(&json!({ "phone": "07123 456789", "duration": 3600 }))
            .expect("boundary ok");
        assert_eq!(data.duration, Some(3600));
    }

    #[test]
    fn demo_call_outcome_constrained() {
        let data = validate_demo_call(
            &json!({ "phone": "07123 456789", "outcome": "callback_requested" }),
        )
        .expect("valid outcome");
        assert_eq!(data.outcome, Some(CallOutcome::CallbackRequested));

        let errors =
            validate_demo_call(&json!({ "phone": "07123 456789", "outcome": "maybe" }))
                .expect_err("bad outcome");
        assert_eq!(errors[0].field, "outcome");
    }

    #[test]
    fn demo_call_parses_iso_timestamp() {
        let data = validate_demo_call(
            &json!({ "phone": "07123 456789", "timestamp": "2025-06-01T12:30:00Z" }),
        )
        .expect("valid timestamp");
        assert_eq!(data.timestamp.to_rfc3339(), "2025-06-01T12:30:00+00:00");

        let errors = validate_demo_call(
            &json!({ "phone": "07123 456789", "timestamp": "June 1st" }),
        )
        .expect_err("bad timestamp");
        assert_eq!(errors[0].message, "Timestamp must be in ISO format");
    }

    #[test]
    fn sanitize_trims_and_escapes() {
        assert_eq!(sanitize("  hello  "), "hello");
        assert_eq!(sanitize("a & b"), "a &amp; b");
        assert_eq!(sanitize("\"quote'"), "&quot;quote&#x27;");
    }
}
