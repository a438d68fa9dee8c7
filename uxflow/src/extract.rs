//! Isolation of the uncertain-value token from program output.

use crate::core::UncertainValueToken;
use crate::errors::UxflowError;

/// Prefix that opens an uncertain value in program output.
pub const MARKER: &str = "Ux";

/// Extracts the uncertain-value token from raw task output.
///
/// The token is the marker followed by everything after its first
/// occurrence. Later occurrences are part of the remainder.
pub fn extract(raw: Option<&str>) -> Result<UncertainValueToken, UxflowError> {
    let raw = match raw {
        Some(text) if !text.is_empty() => text,
        _ => return Err(UxflowError::EmptyOutput),
    };

    let (_, rest) = raw
        .split_once(MARKER)
        .ok_or(UxflowError::MarkerNotFound { marker: MARKER })?;

    Ok(UncertainValueToken::new(format!("{MARKER}{rest}")))
}
