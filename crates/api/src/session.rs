//! Session cookie transport.

use axum::http::{HeaderMap, HeaderValue, header};

pub const SESSION_COOKIE: &str = "token";

/// Attributes of the `token` cookie set at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCookie {
    pub max_age: chrono::Duration,
    pub secure: bool,
}

impl SessionCookie {
    pub fn new(max_age: chrono::Duration, secure: bool) -> Self {
        Self { max_age, secure }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn issue(&self, token: &str) -> Option<HeaderValue> {
        self.render(token, self.max_age.num_seconds())
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear(&self) -> Option<HeaderValue> {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age_secs: i64) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

/// Session token from the `token` cookie, else from `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_cookie_carries_session_attributes() {
        let cookie = SessionCookie::new(chrono::Duration::hours(24), false)
            .issue("abc")
            .unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "token=abc; HttpOnly; SameSite=Strict; Path=/; Max-Age=86400"
        );

        let secure = SessionCookie::new(chrono::Duration::hours(1), true)
            .clear()
            .unwrap();
        assert_eq!(
            secure.to_str().unwrap(),
            "token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Secure"
        );
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn empty_or_missing_tokens_are_ignored() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_token(&headers), None);
    }
}
