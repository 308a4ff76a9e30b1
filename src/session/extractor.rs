use super::controller::Session;
use crate::error::SessionError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Extract the current request's [`Session`].
///
/// Rejects with [`SessionError::NotInitialized`] (500) if
/// [`SessionLayer`](super::SessionLayer) is not installed in front of the
/// handler.
///
/// ```rust,ignore
/// async fn login(session: Session) -> Result<&'static str, SessionError> {
///     session.set("user_id", 42).await?;
///     session.bump().await;
///     Ok("logged in")
/// }
/// ```
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(SessionError::NotInitialized)
    }
}
