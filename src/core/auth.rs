//! Account signup/signin and server-side sessions.
//!
//! A session is an opaque bearer token stored next to the users; every
//! request presenting it is checked against the stored record and its
//! expiry, so nothing the client holds is trusted on its own.

use crate::core::db::{Collections, Database};
use crate::domain::model::{Role, Session, User, UserView};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{is_valid_email, validate_non_empty_string};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub admin_emails: Vec<String>,
    pub session_ttl: Duration,
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub user: UserView,
    pub token: String,
}

/// Argon2id PHC string; the salt is embedded in it.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Io(io::Error::other(e.to_string())))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Argon2 is deliberately slow; keep it off the async workers.
async fn off_runtime<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Io(io::Error::other(e)))
}

/// 32 bytes from the OS generator, hex encoded.
pub(crate) fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn prune_expired(collections: &mut Collections, now: DateTime<Utc>) {
    collections.sessions.retain(|_, s| s.expires_at > now);
}

pub struct AuthService {
    db: Arc<Database>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(db: Arc<Database>, settings: AuthSettings) -> Self {
        Self { db, settings }
    }

    fn role_for(&self, email: &str) -> Role {
        if self
            .settings
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
        {
            Role::Admin
        } else {
            Role::User
        }
    }

    fn open_session(&self, collections: &mut Collections, user: &User, now: DateTime<Utc>) -> String {
        prune_expired(collections, now);
        let token = random_token();
        collections.sessions.insert(
            token.clone(),
            Session {
                token: token.clone(),
                user_id: user.id.clone(),
                role: user.role,
                expires_at: now + self.settings.session_ttl,
            },
        );
        token
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthOutcome> {
        validate_non_empty_string("name", &request.name)?;
        validate_non_empty_string("email", &request.email)?;
        validate_non_empty_string("password", &request.password)?;
        let email = request.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("email", "Invalid email address"));
        }
        if request.password.chars().count() < self.settings.min_password_length {
            return Err(AppError::validation(
                "password",
                format!(
                    "Password must be at least {} characters",
                    self.settings.min_password_length
                ),
            ));
        }

        let password = request.password.clone();
        let password_hash = off_runtime(move || hash_password(&password)).await??;

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: email.clone(),
            password_hash,
            role: self.role_for(&email),
            created_at: now,
        };

        let outcome = self
            .db
            .write(|c| {
                if c.users.contains_key(&email) {
                    return Err(AppError::validation("email", "User already exists"));
                }
                let token = self.open_session(c, &user, now);
                c.users.insert(email.clone(), user.clone());
                Ok(AuthOutcome {
                    success: true,
                    user: UserView::from(&user),
                    token,
                })
            })
            .await?;

        tracing::info!(user_id = %outcome.user.id, role = ?outcome.user.role, "User signed up");
        Ok(outcome)
    }

    pub async fn signin(&self, request: SigninRequest) -> Result<AuthOutcome> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .db
            .read(|c| c.users.get(&email).cloned())
            .await
            .ok_or(AppError::InvalidCredentials)?;

        let password = request.password;
        let stored = user.password_hash.clone();
        if !off_runtime(move || verify_password(&password, &stored)).await? {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        let outcome = self
            .db
            .write(|c| {
                if !c.users.contains_key(&email) {
                    return Err(AppError::InvalidCredentials);
                }
                let token = self.open_session(c, &user, now);
                Ok(AuthOutcome {
                    success: true,
                    user: UserView::from(&user),
                    token,
                })
            })
            .await?;

        tracing::info!(user_id = %outcome.user.id, "User signed in");
        Ok(outcome)
    }

    pub async fn signout(&self, token: &str) -> Result<()> {
        self.db
            .write(|c| {
                c.sessions.remove(token);
                Ok(())
            })
            .await
    }

    /// Resolve a bearer token to a live session.
    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        let now = Utc::now();
        self.db
            .read(|c| c.sessions.get(token).cloned())
            .await
            .filter(|s| s.expires_at > now)
            .ok_or(AppError::Unauthorized)
    }
}
