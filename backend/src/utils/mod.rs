//! Collection of general utility functions.
//!
//! Small helpers shared by the configuration layer, the credential exchange
//! strategies and the session bridge.

pub mod jwt;

/// Interprets a loosely-typed boolean flag.
///
/// `true`, `1`, `yes` and `on` (trimmed, case-insensitive) are truthy; any
/// other present value is falsy. An absent value yields `default`.
pub fn normalize_boolean(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(raw) => {
            let normalized = raw.trim().to_lowercase();
            matches!(normalized.as_str(), "true" | "1" | "yes" | "on")
        }
        None => default,
    }
}

/// Returns the trimmed value, or `None` when it is missing or blank.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
