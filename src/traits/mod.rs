//! Trait definitions for extensible components
//!
//! Storage backends plug into the session layer by implementing
//! [`session::SessionStore`].

pub mod session;
