//! Session cookie
//!
//! The backend token lives in an HttpOnly `session` cookie. Browsers send
//! it back on every request; scripts cannot read it.

/// Name of the cookie holding the backend token
pub const SESSION_COOKIE: &str = "session";

/// Session cookie lifetime (7 days)
pub const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// `Set-Cookie` value storing `token`
pub fn set_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session
pub fn clear_cookie() -> &'static str {
    "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_attributes() {
        let cookie = set_cookie("abc", false);
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
        assert!(set_cookie("abc", true).ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires() {
        assert!(clear_cookie().starts_with("session=;"));
        assert!(clear_cookie().contains("Max-Age=0"));
    }
}
