//! Macro for implementing Display and FromStr for string-coded enums
//!
//! Recurrence kinds and queue statuses are stored and transmitted as
//! lowercase strings; this macro keeps both directions of the mapping in one
//! place.
//!
//! # Example
//!
//! ```rust
//! use tether_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Priority {
//!     Low,
//!     High,
//! }
//!
//! impl_domain_status_conversions!(Priority {
//!     Low => "low",
//!     High => "high",
//! });
//!
//! assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
//! ```

/// Implements Display and FromStr traits for string-coded enums
///
/// - Display writes the mapped string
/// - FromStr parses case-insensitively and names the enum in its error
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
