//! Finds the stored definition applicable to an inbound request.
//!
//! Matching is exact: one canonical leading slash, then byte equality on
//! path and enum equality on method. No wildcards, no trailing-slash
//! normalization.

use mockd_models::{normalize_path, EndpointDefinition, Method, MockError};

pub fn find<'a>(
    definitions: &'a [EndpointDefinition],
    method: Method,
    path: &str,
) -> Result<&'a EndpointDefinition, MockError> {
    let path = normalize_path(path);
    definitions
        .iter()
        .find(|d| d.path == path && d.method == method)
        .ok_or(MockError::NoMatchingEndpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn definition(path: &str, method: Method) -> EndpointDefinition {
        EndpointDefinition {
            id: 1,
            path: path.to_string(),
            method,
            response: json!({}),
            status: 200,
            auth_key: None,
            schema: None,
            upstream: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_exact_match() {
        let defs = vec![
            definition("/users", Method::Get),
            definition("/users", Method::Post),
        ];

        let found = find(&defs, Method::Post, "/users").unwrap();
        assert_eq!(found.method, Method::Post);
    }

    #[test]
    fn test_leading_slash_is_canonicalized() {
        let defs = vec![definition("/users", Method::Get)];
        assert!(find(&defs, Method::Get, "users").is_ok());
    }

    #[test]
    fn test_method_mismatch_is_no_match() {
        let defs = vec![definition("/users", Method::Get)];
        let err = find(&defs, Method::Delete, "/users").unwrap_err();
        assert!(matches!(err, MockError::NoMatchingEndpoint));
    }

    #[test]
    fn test_trailing_slash_is_significant() {
        let defs = vec![definition("/users", Method::Get)];
        assert!(find(&defs, Method::Get, "/users/").is_err());
    }

    #[test]
    fn test_no_prefix_matching() {
        let defs = vec![definition("/users", Method::Get)];
        assert!(find(&defs, Method::Get, "/users/42").is_err());
    }
}
