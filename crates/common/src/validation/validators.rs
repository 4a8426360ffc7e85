// Validator implementations
use std::fmt::Display;

/// Trait for field validators
pub trait FieldValidator<T: ?Sized> {
    /// Validate a field value
    fn validate(&self, value: &T) -> Result<(), String>;
}

/// Range validator for ordered types (numbers, dates)
#[derive(Debug, Clone)]
pub struct RangeValidator<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T> Default for RangeValidator<T>
where
    T: PartialOrd + Display,
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> RangeValidator<T>
where
    T: PartialOrd + Display,
{
    /// Create a new range validator with no constraints
    pub const fn empty() -> Self {
        Self { min: None, max: None }
    }

    /// Create a new range validator with inclusive min and max values
    pub const fn new(min: T, max: T) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    /// Set minimum value
    pub fn min(mut self, min: T) -> Self {
        self.min = Some(min);
        self
    }

    /// Set maximum value
    pub fn max(mut self, max: T) -> Self {
        self.max = Some(max);
        self
    }
}

impl<T> FieldValidator<T> for RangeValidator<T>
where
    T: PartialOrd + Display,
{
    fn validate(&self, value: &T) -> Result<(), String> {
        if let Some(ref min) = self.min {
            if value < min {
                return Err(format!("Value must be at least {min}"));
            }
        }

        if let Some(ref max) = self.max {
            if value > max {
                return Err(format!("Value must not exceed {max}"));
            }
        }

        Ok(())
    }
}

/// String validator with various constraints
///
/// Lengths are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct StringValidator {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<regex::Regex>,
    not_empty: bool,
    trim: bool,
}

impl Default for StringValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StringValidator {
    /// Create a new string validator
    pub const fn new() -> Self {
        Self { min_length: None, max_length: None, pattern: None, not_empty: false, trim: true }
    }

    /// Require non-empty string
    pub const fn not_empty(mut self) -> Self {
        self.not_empty = true;
        self
    }

    /// Set minimum length
    pub const fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set maximum length
    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Set pattern to match
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(regex::Regex::new(pattern)?);
        Ok(self)
    }

    /// Set whether to trim before validation
    pub const fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

impl FieldValidator<str> for StringValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        let val = if self.trim { value.trim() } else { value };
        let length = val.chars().count();

        if self.not_empty && val.is_empty() {
            return Err("Value cannot be empty".to_string());
        }

        if let Some(min) = self.min_length {
            if length < min {
                return Err(format!("Length must be at least {min} characters"));
            }
        }

        if let Some(max) = self.max_length {
            if length > max {
                return Err(format!("Length must not exceed {max} characters"));
            }
        }

        if let Some(ref pattern) = self.pattern {
            if !val.is_empty() && !pattern.is_match(val) {
                return Err(format!("Value must match pattern: {}", pattern.as_str()));
            }
        }

        Ok(())
    }
}

impl FieldValidator<String> for StringValidator {
    fn validate(&self, value: &String) -> Result<(), String> {
        FieldValidator::<str>::validate(self, value.as_str())
    }
}

/// Collection validator for slices and vectors
#[derive(Debug, Clone, Default)]
pub struct CollectionValidator {
    min_size: Option<usize>,
    max_size: Option<usize>,
    unique_items: bool,
}

impl CollectionValidator {
    /// Create a new collection validator
    pub const fn new() -> Self {
        Self { min_size: None, max_size: None, unique_items: false }
    }

    /// Set minimum size
    pub const fn min_size(mut self, min: usize) -> Self {
        self.min_size = Some(min);
        self
    }

    /// Set maximum size
    pub const fn max_size(mut self, max: usize) -> Self {
        self.max_size = Some(max);
        self
    }

    /// Require unique items
    pub const fn unique_items(mut self) -> Self {
        self.unique_items = true;
        self
    }
}

impl<T> FieldValidator<[T]> for CollectionValidator
where
    T: PartialEq,
{
    fn validate(&self, value: &[T]) -> Result<(), String> {
        let size = value.len();

        if let Some(min) = self.min_size {
            if size < min {
                return Err(format!("Collection must contain at least {min} items"));
            }
        }

        if let Some(max) = self.max_size {
            if size > max {
                return Err(format!("Collection must not exceed {max} items"));
            }
        }

        if self.unique_items {
            for (index, item) in value.iter().enumerate() {
                if value[..index].contains(item) {
                    return Err(format!(
                        "Collection must contain unique items (duplicate at index {index})"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_validator_counts_characters() {
        let validator = StringValidator::new().max_length(3);
        assert!(validator.validate("äöü").is_ok());
        assert!(validator.validate("abcd").is_err());
    }

    #[test]
    fn string_validator_trims_by_default() {
        let validator = StringValidator::new().not_empty();
        assert_eq!(validator.validate("   ").unwrap_err(), "Value cannot be empty");
        assert!(StringValidator::new().not_empty().trim(false).validate("   ").is_ok());
    }

    #[test]
    fn string_validator_pattern() {
        let validator = StringValidator::new().pattern(r"^[a-z0-9-]+$").unwrap();
        assert!(validator.validate("abc-123").is_ok());
        assert!(validator.validate("abc 123").is_err());
    }

    #[test]
    fn range_validator_is_inclusive() {
        let validator = RangeValidator::new(1970, 2100);
        assert!(validator.validate(&1970).is_ok());
        assert!(validator.validate(&2100).is_ok());
        assert_eq!(validator.validate(&2101).unwrap_err(), "Value must not exceed 2100");
        assert!(RangeValidator::empty().min(5).validate(&4).is_err());
    }

    #[test]
    fn collection_validator_size_and_uniqueness() {
        let validator = CollectionValidator::new().max_size(3).unique_items();
        assert!(validator.validate(&["a", "b"][..]).is_ok());
        assert!(validator.validate(&["a", "b", "c", "d"][..]).is_err());
        let err = validator.validate(&["a", "b", "a"][..]).unwrap_err();
        assert!(err.contains("index 2"));
    }
}
