//! Checking a job's option values against its job type's declared options.
//!
//! Job types declare enumerated options either as a pipe-separated string,
//! `"'STDOUT' | 'FILE'"`, or as a JSON array, `["STDOUT", "FILE"]`.

use serde_json::Value;

use crate::error::ValidationError;

/// The set of values a declared option accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    values: Vec<String>,
}

impl AllowList {
    /// Parse `"'A' | 'B' | C"` into `["A", "B", "C"]`. Empty entries are dropped.
    pub fn parse(declared: &str) -> Self {
        let values = declared
            .split('|')
            .map(|v| v.trim().trim_matches(|c: char| c == '\'' || c == '"').trim())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        Self { values }
    }

    /// Read the allow-list for `option` out of a job type's declared options.
    pub fn from_declared(declared: &Value, option: &str) -> Result<Self, ValidationError> {
        match declared.get(option) {
            Some(Value::String(text)) => Ok(Self::parse(text)),
            Some(Value::Array(items)) => Ok(Self {
                values: items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect(),
            }),
            _ => Err(ValidationError::MissingDeclaration {
                option: option.to_string(),
            }),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Check `provided[option]` against the list and return the accepted value.
    pub fn check<'a>(&self, provided: &'a Value, option: &str) -> Result<&'a str, ValidationError> {
        let value = match provided.get(option) {
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingOption {
                    option: option.to_string(),
                })
            }
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(ValidationError::NotAllowed {
                    option: option.to_string(),
                    value: other.to_string(),
                    allowed: self.values.clone(),
                })
            }
        };
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ValidationError::NotAllowed {
                option: option.to_string(),
                value: value.to_string(),
                allowed: self.values.clone(),
            })
        }
    }
}

/// A non-empty string option the job must provide.
pub fn required_str<'a>(provided: &'a Value, option: &str) -> Result<&'a str, ValidationError> {
    provided
        .get(option)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::MissingOption {
            option: option.to_string(),
        })
}
