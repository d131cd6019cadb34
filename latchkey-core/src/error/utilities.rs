use crate::error::ValidationError;

/// Extension trait for optional string inputs that must be present and non-blank
///
/// Client input errors are rejected before any store interaction, so callers
/// run every required field through this first.
///
/// # Example
///
/// ```rust
/// use latchkey_core::error::utilities::RequiredFieldExt;
///
/// let token: Option<&str> = Some("abc");
/// let token = token.require_field("token").unwrap();
/// assert_eq!(token, "abc");
/// ```
pub trait RequiredFieldExt<T> {
    /// Convert None or a blank value to a ValidationError::MissingField
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl<T: AsRef<str>> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError> {
        match self {
            Some(value) if !value.as_ref().trim().is_empty() => Ok(value),
            _ => Err(ValidationError::MissingField(format!(
                "{field_name} is required"
            ))),
        }
    }
}
