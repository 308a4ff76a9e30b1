//! Tideway Sessions - signed-cookie server-side sessions for Axum
//!
//! A session is a bag of key/value data held in a [`SessionStore`] and
//! addressed by an opaque ID. The client only ever holds a signed cookie
//! carrying that ID and an epoch counter.
//!
//! # Features
//!
//! - **Signed cookies**: HMAC-SHA256 tokens, verified in constant time
//! - **Epochs**: [`Session::bump`] invalidates every previously issued cookie
//! - **Lazy loading**: storage is only touched when a handler uses the session
//! - **Write-back**: changes are saved once, after the handler finishes
//! - **Pluggable storage**: implement three methods of [`SessionStore`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use std::sync::Arc;
//! use tideway_sessions::{InMemorySessionStore, Session, SessionConfig, SessionManager};
//!
//! async fn counter(session: Session) -> String {
//!     let visits: u64 = session.get("visits").await.ok().flatten().unwrap_or(0);
//!     let _ = session.set("visits", visits + 1).await;
//!     format!("{} visits", visits + 1)
//! }
//!
//! #[tokio::main]
//! async fn main() -> tideway_sessions::Result<()> {
//!     tideway_sessions::init_tracing();
//!
//!     let manager = SessionManager::new(
//!         &SessionConfig::from_env(),
//!         Arc::new(InMemorySessionStore::new()),
//!     )?;
//!
//!     let app: Router = Router::new()
//!         .route("/", get(counter))
//!         .layer(manager.layer());
//!     # let _ = app;
//!     Ok(())
//! }
//! ```

mod error;
pub mod session;
pub mod testing;
pub mod traits;
mod utils;

pub use error::{Result, SessionError};
pub use session::{
    InMemorySessionStore, SecureCookie, Session, SessionConfig, SessionConfigBuilder,
    SessionLayer, SessionManager, SessionService, SessionToken, SigningKey,
};
pub use traits::session::{ReservedKey, SessionData, SessionId, SessionStore};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "tideway_sessions=debug")
/// - `TIDEWAY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    init_with_filter(env_filter);
}

/// Initialize tracing with an explicit filter directive, e.g. `"tideway_sessions=debug"`
pub fn init_tracing_with_level(directive: &str) {
    init_with_filter(EnvFilter::new(directive));
}

fn init_with_filter(env_filter: EnvFilter) {
    let json_logs = utils::get_env_parsed::<bool>("LOG_JSON").unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
