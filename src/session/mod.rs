//! Session management.
//!
//! Signed, epoch-checked session cookies bound to server-side data held in a
//! [`SessionStore`](crate::SessionStore).

mod config;
mod controller;
pub mod cookie;
mod extractor;
mod in_memory;
mod key;
mod layer;
mod manager;
mod token;

pub use config::{SecureCookie, SessionConfig, SessionConfigBuilder};
pub use controller::Session;
pub use in_memory::InMemorySessionStore;
pub use key::{MIN_KEY_LEN, SigningKey};
pub use layer::{SessionLayer, SessionService};
pub use manager::SessionManager;
pub use token::SessionToken;
