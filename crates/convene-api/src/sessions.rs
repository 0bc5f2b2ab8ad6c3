use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{TimeDelta, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use convene_db::Database;
use convene_types::models::Principal;

use crate::state::blocking;

pub const SESSION_COOKIE: &str = "c.id";

/// Random bytes per session id (256 bits before encoding).
const SESSION_ID_BYTES: usize = 32;

/// Lookups only rewrite the expiry once it has fallen this far behind.
const MAX_REFRESH_SLACK_SECS: i64 = 300;

/// Opaque session identifier as handed to the client. Only its SHA-256
/// digest ever reaches the store.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(B64.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the raw id.
impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionId(..)")
    }
}

fn refresh_slack(ttl: TimeDelta) -> i64 {
    MAX_REFRESH_SLACK_SECS.min(ttl.num_seconds() / 2)
}

fn digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Cookie attributes for the deployment.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
}

impl CookiePolicy {
    /// Cross-site deployments need `SameSite=None`, which browsers only accept
    /// with `Secure`. Same-site deployments use `Strict` and only require
    /// `Secure` in production so plain-http local development still works.
    pub fn for_deployment(production: bool, cross_site: bool, domain: Option<String>) -> Self {
        if cross_site {
            Self {
                same_site: SameSite::None,
                secure: true,
                domain,
            }
        } else {
            Self {
                same_site: SameSite::Strict,
                secure: production,
                domain,
            }
        }
    }
}

/// Persistent session store. Created once at startup and shared through
/// `AppState`; the server owns the sweeper task and stops it at shutdown.
#[derive(Clone)]
pub struct SessionRegistry {
    db: Arc<Database>,
    ttl: TimeDelta,
    cookie: CookiePolicy,
}

impl SessionRegistry {
    pub fn new(db: Arc<Database>, ttl: TimeDelta, cookie: CookiePolicy) -> Self {
        Self { db, ttl, cookie }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub async fn create(&self, principal: &Principal) -> anyhow::Result<SessionId> {
        let id = SessionId::generate();
        let hash = digest(id.as_str());
        let now = Utc::now().timestamp();
        let expires_at = now + self.ttl.num_seconds();
        let principal = principal.clone();
        let db = self.db.clone();

        blocking(move || db.insert_session(&hash, &principal, now, expires_at)).await?;
        Ok(id)
    }

    /// Resolve a raw cookie value. Unknown and expired ids both yield `None`.
    /// A hit slides the expiry forward to one TTL from now, writing only when
    /// the stored expiry is more than the refresh slack behind.
    pub async fn lookup(&self, raw: &str) -> anyhow::Result<Option<Principal>> {
        if raw.is_empty() {
            return Ok(None);
        }
        let hash = digest(raw);
        let now = Utc::now().timestamp();
        let expires_at = now + self.ttl.num_seconds();
        let slack = refresh_slack(self.ttl);
        let db = self.db.clone();

        blocking(move || db.resolve_session(&hash, now, expires_at, slack)).await
    }


    /// Idempotent: destroying an unknown session is not an error.
    pub async fn destroy(&self, raw: &str) -> anyhow::Result<()> {
        let hash = digest(raw);
        let db = self.db.clone();
        let removed = blocking(move || db.delete_session(&hash)).await?;
        debug!("Session destroyed ({} row(s))", removed);
        Ok(())
    }

    /// Delete every expired session. Returns how many were removed.
    pub async fn sweep(&self) -> anyhow::Result<usize> {
        let now = Utc::now().timestamp();
        let db = self.db.clone();
        let purged = blocking(move || db.purge_expired_sessions(now)).await?;
        if purged > 0 {
            info!("Session sweep: purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    pub fn cookie(&self, id: &SessionId) -> Cookie<'static> {
        let mut cookie = self.base_cookie(id.as_str().to_string());
        cookie.set_max_age(time::Duration::seconds(self.ttl.num_seconds()));
        cookie
    }

    /// Expired, empty cookie carrying the same attributes as the live one so
    /// the browser matches and drops it.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new());
        cookie.make_removal();
        cookie
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_same_site(self.cookie.same_site);
        cookie.set_secure(self.cookie.secure);
        if let Some(domain) = &self.cookie.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}
