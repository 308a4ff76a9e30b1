//! Session cookie plumbing
//!
//! Reading the session cookie from a request, building the outgoing
//! `Set-Cookie` value, and keeping at most one `Set-Cookie` entry per
//! cookie name in a response.

use crate::error::{Result, SessionError};
use axum::http::{HeaderMap, HeaderValue, Uri, header};
use cookie::Cookie;
use cookie::time::Duration;

/// Find the value of the named cookie in the request's `Cookie` headers.
///
/// The first non-empty match wins. Malformed pairs and empty values are
/// skipped.
pub fn find_request_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(|parsed| parsed.ok())
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Build the session cookie.
///
/// An empty value produces a removal cookie with `Max-Age=-1`; any other
/// value produces a browser-session cookie without `Max-Age`.
pub fn build_session_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    let clearing = value.is_empty();

    let mut builder = Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure);

    if clearing {
        builder = builder.max_age(Duration::seconds(-1));
    }

    builder.build()
}

/// Append `cookie` as a `Set-Cookie` header, dropping any earlier
/// `Set-Cookie` entries for the same cookie name.
pub fn replace_set_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionError::configuration(format!("Invalid Set-Cookie value: {}", e)))?;

    let kept: Vec<HeaderValue> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|existing| set_cookie_name(existing) != Some(cookie.name()))
        .cloned()
        .collect();

    headers.remove(header::SET_COOKIE);
    for existing in kept {
        headers.append(header::SET_COOKIE, existing);
    }
    headers.append(header::SET_COOKIE, value);

    Ok(())
}

fn set_cookie_name(value: &HeaderValue) -> Option<&str> {
    let raw = value.to_str().ok()?;
    let (name, _) = raw.split_once('=')?;
    Some(name.trim())
}

/// Whether the request arrived over an encrypted connection.
///
/// Looks at the request URI scheme and, when `trust_forwarded` is set, at
/// `X-Forwarded-Proto` and the `proto` parameter of `Forwarded`.
pub fn is_secure_request(uri: &Uri, headers: &HeaderMap, trust_forwarded: bool) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }

    if !trust_forwarded {
        return false;
    }

    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"));
    if let Some(secure) = forwarded_proto {
        return secure;
    }

    headers
        .get(header::FORWARDED)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|first| {
            first.split(';').any(|pair| {
                pair.split_once('=').is_some_and(|(k, v)| {
                    k.trim().eq_ignore_ascii_case("proto")
                        && v.trim().trim_matches('"').eq_ignore_ascii_case("https")
                })
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: header::HeaderName, values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_find_request_cookie() {
        let headers = headers_with(header::COOKIE, &["theme=dark; s=abc123", "s=second"]);
        assert_eq!(find_request_cookie(&headers, "s"), Some("abc123".to_string()));
        assert_eq!(find_request_cookie(&headers, "theme"), Some("dark".to_string()));
        assert_eq!(find_request_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_find_request_cookie_skips_empty_values() {
        let headers = headers_with(header::COOKIE, &["s=; theme=dark", "s=valid"]);
        assert_eq!(find_request_cookie(&headers, "s"), Some("valid".to_string()));

        let headers = headers_with(header::COOKIE, &["s="]);
        assert_eq!(find_request_cookie(&headers, "s"), None);
    }

    #[test]
    fn test_find_request_cookie_skips_garbage() {
        let headers = headers_with(header::COOKIE, &["garbage; s=ok"]);
        assert_eq!(find_request_cookie(&headers, "s"), Some("ok".to_string()));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = build_session_cookie("s", "token".to_string(), true);
        assert_eq!(cookie.name(), "s");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), None);
    }

    #[test]
    fn test_clearing_cookie_expires_immediately() {
        let cookie = build_session_cookie("s", String::new(), false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::seconds(-1)));

        let rendered = cookie.to_string();
        assert!(rendered.contains("Max-Age=-1"), "{}", rendered);
        assert!(!rendered.contains("Secure"), "{}", rendered);
    }

    #[test]
    fn test_replace_set_cookie_drops_same_name() {
        let mut headers = headers_with(
            header::SET_COOKIE,
            &["s=old; Path=/", "theme=dark", "sid=other"],
        );

        let cookie = build_session_cookie("s", "new".to_string(), false);
        replace_set_cookie(&mut headers, &cookie).unwrap();

        let values: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values.len(), 3);
        assert!(values.contains(&"theme=dark"));
        assert!(values.contains(&"sid=other"));
        assert_eq!(values.iter().filter(|v| v.starts_with("s=")).count(), 1);
        assert!(values.iter().any(|v| v.starts_with("s=new")));
    }

    #[test]
    fn test_replace_set_cookie_twice_keeps_last() {
        let mut headers = HeaderMap::new();
        replace_set_cookie(&mut headers, &build_session_cookie("s", "one".into(), false)).unwrap();
        replace_set_cookie(&mut headers, &build_session_cookie("s", "two".into(), false)).unwrap();

        let values: Vec<_> = headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 1);
        assert!(values[0].to_str().unwrap().starts_with("s=two"));
    }

    #[test]
    fn test_secure_detection() {
        let plain: Uri = "/path".parse().unwrap();
        let https: Uri = "https://example.com/path".parse().unwrap();
        let empty = HeaderMap::new();

        assert!(is_secure_request(&https, &empty, false));
        assert!(!is_secure_request(&plain, &empty, true));

        let forwarded = headers_with("x-forwarded-proto".parse().unwrap(), &["https"]);
        assert!(!is_secure_request(&plain, &forwarded, false));
        assert!(is_secure_request(&plain, &forwarded, true));

        let rfc7239 = headers_with(header::FORWARDED, &["for=1.2.3.4;proto=https"]);
        assert!(is_secure_request(&plain, &rfc7239, true));

        let http = headers_with("x-forwarded-proto".parse().unwrap(), &["http"]);
        assert!(!is_secure_request(&plain, &http, true));
    }
}
