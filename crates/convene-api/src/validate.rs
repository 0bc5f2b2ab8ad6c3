use chrono::{DateTime, NaiveDate, NaiveDateTime};

use convene_types::api::FieldError;

use crate::error::ApiError;

pub const MAX_NAME: usize = 100;
pub const MAX_EMAIL: usize = 100;
pub const MIN_PASSWORD: usize = 8;
pub const MAX_PASSWORD: usize = 50;
pub const MAX_IMAGE_URL: usize = 255;
pub const MAX_TITLE: usize = 100;
pub const MAX_DESCRIPTION: usize = 1000;
pub const MAX_RESUME: usize = 100;
pub const MAX_LOCATION: usize = 500;

/// Collects field errors so one response can report all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Trimmed, non-empty, at most `max` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.reject(field, "must not be empty");
        } else if value.chars().count() > max {
            self.reject(field, format!("must be at most {} characters", max));
        }
        value.to_string()
    }

    /// Trimmed; blank input is treated as absent.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        if value.chars().count() > max {
            self.reject(field, format!("must be at most {} characters", max));
        }
        Some(value.to_string())
    }

    pub fn email(&mut self, field: &str, value: &str) -> String {
        let value = self.required_text(field, value, MAX_EMAIL);
        let well_formed = value
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
            });
        if !value.is_empty() && !well_formed {
            self.reject(field, "must be a valid email address");
        }
        value
    }

    pub fn password(&mut self, field: &str, value: &str) {
        let len = value.chars().count();
        if !(MIN_PASSWORD..=MAX_PASSWORD).contains(&len) {
            self.reject(
                field,
                format!("must be between {} and {} characters", MIN_PASSWORD, MAX_PASSWORD),
            );
        }
    }

    pub fn url(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = self.optional_text(field, value, max)?;
        if !(value.starts_with("https://") || value.starts_with("http://")) {
            self.reject(field, "must be an http(s) URL");
        }
        Some(value)
    }

    /// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` and plain dates.
    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = self.optional_text(field, value, 64)?;
        let parses = DateTime::parse_from_rfc3339(&value).is_ok()
            || NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S").is_ok()
            || NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M").is_ok()
            || NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok();
        if !parses {
            self.reject(field, "must be a date (YYYY-MM-DD) or timestamp");
        }
        Some(value)
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}
