//! Testing utilities for session-aware applications
//!
//! - [`Scenario`]: drive an axum `Router` in-process and inspect the
//!   `Set-Cookie` headers it emits
//! - [`RecordingStore`]: wraps a store and counts every storage call
//! - [`FailingStore`]: a store whose every operation fails
//!
//! # Example
//!
//! ```rust,ignore
//! use tideway_sessions::testing;
//!
//! #[tokio::test]
//! async fn test_login_sets_cookie() {
//!     let app = build_app();
//!
//!     let response = testing::post(app, "/login").execute().await.assert_ok();
//!     let cookie = response.set_cookie("s").expect("session cookie");
//!     assert!(!cookie.value().is_empty());
//! }
//! ```

mod scenario;
mod store;

pub use scenario::{Scenario, ScenarioAssert, get, post};
pub use store::{FailingStore, RecordingStore};
