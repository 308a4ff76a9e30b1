use super::manager::SessionManager;
use axum::body::Body;
use axum::{extract::Request, http::Response};
use futures::future::BoxFuture;
use tower::Service;

/// Tower layer that gives every request its own [`Session`](super::Session)
///
/// The session is inserted into request extensions before the inner
/// service runs. After the inner service completes, pending changes are
/// saved once and the session `Set-Cookie` is written, replacing any
/// `Set-Cookie` for the same name set further down the stack.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, routing::get};
/// use std::sync::Arc;
/// use tideway_sessions::{InMemorySessionStore, Session, SessionConfig, SessionManager};
///
/// async fn visit(session: Session) -> String {
///     let count: u64 = session.get("visits").await.ok().flatten().unwrap_or(0);
///     session.set("visits", count + 1).await.ok();
///     format!("visit #{}", count + 1)
/// }
///
/// let manager = SessionManager::new(
///     &SessionConfig::from_env(),
///     Arc::new(InMemorySessionStore::new()),
/// )?;
/// let app: Router = Router::new().route("/", get(visit)).layer(manager.layer());
/// ```
#[derive(Clone)]
pub struct SessionLayer {
    manager: SessionManager,
}

impl SessionLayer {
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }
}

impl<S> tower::Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            manager: self.manager.clone(),
        }
    }
}

/// Tower service that manages the per-request session
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    manager: SessionManager,
}

impl<S> Service<Request> for SessionService<S>
where
    S: Service<Request, Response = Response<Body>> + Send + 'static,
    S::Future: Send,
    S::Error: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let session = self.manager.start(req.uri(), req.headers());
        req.extensions_mut().insert(session.clone());

        let fut = self.inner.call(req);

        // If the returned future is dropped (timeout, client disconnect),
        // neither the flush nor the cookie write happens.
        Box::pin(async move {
            match fut.await {
                Ok(mut response) => {
                    session.finish(Some(response.headers_mut())).await;
                    Ok(response)
                }
                Err(err) => {
                    session.finish(None).await;
                    Err(err)
                }
            }
        })
    }
}
