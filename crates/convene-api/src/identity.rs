use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use convene_types::models::Principal;

use crate::error::ApiError;
use crate::sessions::SESSION_COOKIE;
use crate::state::AppState;

/// Who is calling, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(Principal),
}

impl Identity {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(p) => Some(p),
            Self::Anonymous => None,
        }
    }

    /// The principal, or `Unauthorized` for anonymous callers.
    pub fn require(&self) -> Result<&Principal, ApiError> {
        self.principal().ok_or(ApiError::Unauthorized)
    }
}

/// Middleware: resolve the session cookie and attach an [`Identity`].
///
/// No cookie, an unknown or expired session, and a failed lookup all yield
/// `Identity::Anonymous`; handlers decide whether that is acceptable.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match jar.get(SESSION_COOKIE) {
        None => Identity::Anonymous,
        Some(cookie) => match state.sessions.lookup(cookie.value()).await {
            Ok(Some(principal)) => Identity::Authenticated(principal),
            Ok(None) => Identity::Anonymous,
            Err(e) => {
                warn!("Session lookup failed, treating caller as anonymous: {}", e);
                Identity::Anonymous
            }
        },
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}
