use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

use convene_db::Database;
use convene_types::models::Principal;

use crate::error::ApiError;
use crate::state::blocking;

#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("no user with that email")]
    NotFound,

    #[error("password does not match")]
    WrongPassword,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Both credential failures collapse into the same 401 so the response does
/// not reveal which emails are registered.
impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::NotFound | AuthFailure::WrongPassword => {
                debug!("Login rejected: {}", failure);
                ApiError::Unauthorized
            }
            AuthFailure::Store(err) => ApiError::from(err),
        }
    }
}

const SALT_BYTES: usize = 16;

/// Argon2id with a fresh random salt, PHC string encoded.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!("Salt encoding failed: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Constant-time verification against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("Stored hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub struct Credentials {
    db: Arc<Database>,
}

impl Credentials {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn verify(&self, email: &str, password: &str) -> Result<Principal, AuthFailure> {
        let db = self.db.clone();
        let email = email.trim().to_string();
        let password = password.to_string();

        blocking(move || {
            let Some(user) = db.get_user_by_email(&email)? else {
                return Ok(Err(AuthFailure::NotFound));
            };
            if !verify_password(&password, &user.password_hash)? {
                return Ok(Err(AuthFailure::WrongPassword));
            }
            Ok(Ok(user.principal()))
        })
        .await?
    }

    /// Hash `password` and insert the user. A taken email surfaces as `Conflict`.
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
        image: Option<String>,
    ) -> Result<i64, ApiError> {
        let db = self.db.clone();
        blocking(move || {
            let hash = hash_password(&password)?;
            db.create_user(&name, &email, &hash, image.as_deref())
        })
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("An account with this email already exists".into()),
            other => other,
        })
    }
}
