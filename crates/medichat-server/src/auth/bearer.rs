use axum::http::HeaderValue;

/// Token from an `Authorization: Bearer <token>` header. An empty token counts
/// as missing.
pub fn extract_bearer(header: Option<&HeaderValue>) -> Option<String> {
    let value = header?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    #[test]
    fn test_extracts_token() {
        assert_eq!(
            extract_bearer(Some(&header("Bearer abc.def"))).as_deref(),
            Some("abc.def")
        );
        assert_eq!(
            extract_bearer(Some(&header("bearer  xyz "))).as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_rejects_missing_or_malformed() {
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some(&header("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(extract_bearer(Some(&header("Bearer    "))), None);
        assert_eq!(extract_bearer(Some(&header("Bearerabc"))), None);
    }
}
