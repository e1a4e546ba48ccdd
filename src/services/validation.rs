//! Field validators for identities and tasks.
//!
//! Each validator returns the normalized value or a message for that field.
//! Callers collect the messages with [`Validator`] and fail once, before
//! anything is written.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::error::{FieldErrors, ServiceError};

pub const MIN_PASSWORD_LENGTH: usize = 7;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error (if any) and hands back the value.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.insert(field.to_string(), message);
                None
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::validation("Validation failed", self.errors))
        }
    }
}

/// Rejects the whole update if any key falls outside `allowed`.
pub fn check_allowed_keys(updates: &Map<String, Value>, allowed: &[&str]) -> Result<(), ServiceError> {
    if updates.keys().all(|key| allowed.contains(&key.as_str())) {
        Ok(())
    } else {
        Err(ServiceError::invalid_updates())
    }
}

pub fn required(value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| "This field is required".to_string())
}

pub fn as_string(value: &Value) -> Result<String, String> {
    value.as_str().map(str::to_string).ok_or_else(|| "Must be a string".to_string())
}

pub fn name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn email(raw: &str) -> Result<String, String> {
    let normalized = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err("Email is invalid!".to_string());
    }
    Ok(normalized)
}

pub fn password(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    if trimmed.to_lowercase().contains("password") {
        return Err("Password can not contain \"password\"".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn age(value: &Value) -> Result<i32, String> {
    let n = value.as_i64().ok_or_else(|| "Age must be an integer".to_string())?;
    age_number(n)
}

pub fn age_number(n: i64) -> Result<i32, String> {
    if n < 0 {
        return Err("Age must be a positive number".to_string());
    }
    i32::try_from(n).map_err(|_| "Age is out of range".to_string())
}

pub fn description(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Description is required".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn completed(value: &Value) -> Result<bool, String> {
    value.as_bool().ok_or_else(|| "Completed must be a boolean".to_string())
}
