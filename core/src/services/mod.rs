//! Domain service catalog.
//!
//! Stateless wrappers that map each backend operation to a verb, a fixed path
//! and typed payloads on top of a shared `ApiClient`. Cloning a service clones
//! the client handle, not the session.

use std::borrow::Cow;

use crate::error::ApiError;

pub mod auth;
pub mod medical;

pub use auth::AuthService;
pub use medical::MedicalService;

/// Percent-encode a caller-supplied id as exactly one path segment.
///
/// Dot segments survive encoding (`%2e%2e` still resolves as `..`), so they
/// are rejected outright, as is the empty id.
pub(crate) fn segment(id: &str) -> Result<Cow<'_, str>, ApiError> {
    if matches!(id, "" | "." | "..") {
        return Err(ApiError::InvalidId(id.to_string()));
    }
    Ok(urlencoding::encode(id))
}
