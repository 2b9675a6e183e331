//! Shared-secret authorization for matched definitions.

use mockd_models::{EndpointDefinition, MockError};
use std::collections::HashMap;

/// Allow unless the definition carries an auth key; with one, the
/// `authorization` header must equal it byte-for-byte. A missing header
/// is a mismatch like any other.
pub fn authorize(
    definition: &EndpointDefinition,
    headers: &HashMap<String, String>,
) -> Result<(), MockError> {
    let Some(expected) = &definition.auth_key else {
        return Ok(());
    };

    match headers.get("authorization") {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(MockError::Unauthorized),
    }
}
