use axum::http::HeaderMap;

/// Set by the session layer in front of this service once a user is signed in.
pub const AUTHENTICATED_USER_HEADER: &str = "X-Authenticated-User";
pub const GUEST_TOKEN_HEADER: &str = "X-Guest-Token";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn authenticated_user(headers: &HeaderMap) -> Option<String> {
    header_value(headers, AUTHENTICATED_USER_HEADER)
}

pub fn guest_token(headers: &HeaderMap) -> Option<String> {
    header_value(headers, GUEST_TOKEN_HEADER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blank_identity_is_treated_as_guest() {
        let mut headers = HeaderMap::new();
        assert_eq!(authenticated_user(&headers), None);
        headers.insert(AUTHENTICATED_USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(authenticated_user(&headers), None);
        headers.insert(AUTHENTICATED_USER_HEADER, HeaderValue::from_static("user-42"));
        assert_eq!(authenticated_user(&headers).as_deref(), Some("user-42"));
    }
}
