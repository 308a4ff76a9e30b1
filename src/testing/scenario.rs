//! In-process HTTP scenarios for session tests

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
};
use cookie::Cookie;
use tower::ServiceExt;

/// Test request builder
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    /// Create a new test scenario with the given app
    pub fn new(app: Router) -> Self {
        let mut request = Request::new(Body::empty());
        *request.uri_mut() = "/".parse().expect("static URI is valid");
        Self { app, request }
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    /// Set the URI/path
    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri.parse().expect("invalid test URI");
        self
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().append(
            HeaderName::from_bytes(key.as_bytes()).expect("invalid header name"),
            HeaderValue::from_str(value).expect("invalid header value"),
        );
        self
    }

    /// Send a cookie with the request
    pub fn cookie(self, name: &str, value: &str) -> Self {
        self.header(header::COOKIE.as_str(), &format!("{}={}", name, value))
    }

    /// Send back a cookie taken from an earlier response
    pub fn with_cookie(self, cookie: &Cookie<'_>) -> Self {
        self.cookie(cookie.name(), cookie.value())
    }

    /// Execute the request and get an assertion builder
    pub async fn execute(self) -> ScenarioAssert {
        let response = self
            .app
            .oneshot(self.request)
            .await
            .expect("router is infallible");
        ScenarioAssert { response }
    }
}

/// Assertion builder for test responses
pub struct ScenarioAssert {
    response: axum::response::Response,
}

impl ScenarioAssert {
    /// Assert the response status code
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    /// Assert status is 200 OK
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    /// All `Set-Cookie` headers, parsed
    pub fn set_cookies(&self) -> Vec<Cookie<'static>> {
        self.response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| {
                let raw = value.to_str().expect("Set-Cookie is not valid UTF-8");
                Cookie::parse(raw.to_string()).expect("Set-Cookie does not parse")
            })
            .collect()
    }

    /// The single `Set-Cookie` for `name`, if any.
    ///
    /// Panics if the response sets the same cookie more than once.
    pub fn set_cookie(&self, name: &str) -> Option<Cookie<'static>> {
        let mut matching: Vec<_> = self
            .set_cookies()
            .into_iter()
            .filter(|cookie| cookie.name() == name)
            .collect();
        assert!(
            matching.len() <= 1,
            "Expected at most one Set-Cookie for '{}', got {}",
            name,
            matching.len()
        );
        matching.pop()
    }

    /// Assert no `Set-Cookie` header was sent
    pub fn assert_no_set_cookie(self) -> Self {
        let cookies = self.set_cookies();
        assert!(cookies.is_empty(), "Unexpected Set-Cookie headers: {:?}", cookies);
        self
    }

    /// Assert the response tells the client to discard cookie `name`
    pub fn assert_cookie_cleared(self, name: &str) -> Self {
        let cookie = self
            .set_cookie(name)
            .unwrap_or_else(|| panic!("No Set-Cookie for '{}'", name));
        assert_eq!(cookie.value(), "", "Cookie '{}' was not cleared", name);
        assert!(
            cookie.max_age().is_some_and(|age| age.whole_seconds() <= 0),
            "Cookie '{}' does not expire immediately",
            name
        );
        self
    }

    /// Get the response body as a string
    pub async fn body_string(self) -> String {
        let bytes = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        String::from_utf8(bytes.to_vec()).expect("body is not valid UTF-8")
    }

    /// Get the underlying response for custom assertions
    pub fn response(self) -> axum::response::Response {
        self.response
    }
}

/// Convenience function to create a GET request scenario
pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

/// Convenience function to create a POST request scenario
pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}
