use regex::Regex;
use std::fmt;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Option<Regex> = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).ok();
}

/// Check attached to a form field
///
/// Every validator except [`Validator::Required`] accepts an absent or empty
/// value; presence is the job of `Required`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    Required,
    /// Length in characters
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Inclusive integer range
    NumberRange {
        min: Option<i64>,
        max: Option<i64>,
    },
    Url,
    Email,
}

impl Validator {
    pub fn max_length(max: usize) -> Self {
        Self::Length {
            min: None,
            max: Some(max),
        }
    }

    pub fn length(min: usize, max: usize) -> Self {
        Self::Length {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn number_range(min: i64, max: i64) -> Self {
        Self::NumberRange {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Validate a raw submitted value, returning the error message on failure
    pub fn validate(&self, value: Option<&str>) -> Result<(), String> {
        let raw = value.unwrap_or_default();
        let value = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ if self.is_required() => return Err("This field is required".to_string()),
            _ => return Ok(()),
        };

        match self {
            Self::Required => Ok(()),

            // Counted on the untrimmed input, which is what text fields store
            Self::Length { min, max } => {
                let len = raw.chars().count();
                if let Some(min) = min {
                    if len < *min {
                        return Err(format!("Must be at least {} characters long", min));
                    }
                }
                if let Some(max) = max {
                    if len > *max {
                        return Err(format!("Must be no more than {} characters long", max));
                    }
                }
                Ok(())
            }

            Self::NumberRange { min, max } => {
                // Unparseable input is reported by the field's coercion step
                let Ok(number) = value.parse::<i64>() else {
                    return Ok(());
                };
                let too_small = min.is_some_and(|min| number < min);
                let too_large = max.is_some_and(|max| number > max);
                if too_small || too_large {
                    return Err(match (min, max) {
                        (Some(min), Some(max)) => {
                            format!("Number must be between {} and {}", min, max)
                        }
                        (Some(min), None) => format!("Number must be at least {}", min),
                        (None, _) => format!("Number must be at most {}", max.unwrap_or(i64::MAX)),
                    });
                }
                Ok(())
            }

            Self::Url => match url::Url::parse(value) {
                Ok(parsed) if parsed.has_host() => Ok(()),
                _ => Err("Invalid URL".to_string()),
            },

            Self::Email => {
                let valid = value.len() <= 254
                    && EMAIL_REGEX
                        .as_ref()
                        .is_some_and(|regex| regex.is_match(value));
                if valid {
                    Ok(())
                } else {
                    Err("Invalid email address".to_string())
                }
            }
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Length { min, max } => write!(f, "length({:?}..={:?})", min, max),
            Self::NumberRange { min, max } => write!(f, "number_range({:?}..={:?})", min, max),
            Self::Url => write!(f, "url"),
            Self::Email => write!(f, "email"),
        }
    }
}
