// src/auth.rs
use crate::db::AccountStore;
use crate::error::ApiError;
use crate::models::{Account, AccountId, RegisterRequest};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "session";
const DEFAULT_FULL_NAME: &str = "Trader";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

// Argon2 is CPU-bound; it runs on the blocking pool.
async fn off_worker<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn register(
    accounts: &dyn AccountStore,
    request: RegisterRequest,
) -> Result<Account, ApiError> {
    let email = normalize_email(&request.email);
    if !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    let password = request.password;
    let password_hash = off_worker(move || hash_password(&password)).await??;
    let account = Account {
        id: AccountId::generate(),
        email,
        password_hash,
        full_name: request
            .full_name
            .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
        phone: String::new(),
        country: String::new(),
        joined_date: today(),
    };
    accounts.insert_account(account.clone()).await?;
    Ok(account)
}

pub async fn authenticate(
    accounts: &dyn AccountStore,
    email: &str,
    password: &str,
) -> Result<AccountId, ApiError> {
    let account = match accounts.find_by_email(&normalize_email(email)).await? {
        Some(account) => account,
        None => return Err(ApiError::AuthFailure),
    };
    let password = password.to_string();
    let stored = account.password_hash.clone();
    if off_worker(move || verify_password(&password, &stored)).await? {
        Ok(account.id)
    } else {
        Err(ApiError::AuthFailure)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    sid: String,
    exp: usize,
}

/// Issues signed session tokens and tracks which of them are still live,
/// so that logout revokes a token before it expires. Expired entries are
/// dropped whenever a new session opens.
pub struct SessionManager {
    secret: Vec<u8>,
    ttl: Duration,
    live: Mutex<HashMap<String, (AccountId, u64)>>,
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

impl SessionManager {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        SessionManager {
            secret: secret.as_bytes().to_vec(),
            ttl,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, account: &AccountId) -> Result<String, AuthError> {
        let sid = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        let exp = now + self.ttl.as_secs();
        let claims = Claims {
            sub: account.to_string(),
            sid: sid.clone(),
            exp: exp as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?;
        let mut live = self.live.lock();
        live.retain(|_, (_, expires)| *expires > now);
        live.insert(sid, (account.clone(), exp));
        Ok(token)
    }

    fn claims(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .ok()
    }

    pub fn current_account(&self, token: Option<&str>) -> Result<AccountId, ApiError> {
        let claims = token
            .and_then(|t| self.claims(t))
            .ok_or(ApiError::Unauthenticated)?;
        match self.live.lock().get(&claims.sid) {
            Some((id, expires)) if id.as_str() == claims.sub && *expires > now_secs() => {
                Ok(id.clone())
            }
            _ => Err(ApiError::Unauthenticated),
        }
    }

    /// Revokes the session behind `token`, if any.
    pub fn close(&self, token: &str) {
        if let Some(claims) = self.claims(token) {
            self.live.lock().remove(&claims.sid);
        }
    }

    #[cfg(test)]
    fn live_sessions(&self) -> usize {
        self.live.lock().len()
    }

    pub fn cookie(token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token
        )
    }

    pub fn cleared_cookie() -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryAccountStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: None,
        }
    }

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let a = hash_password("hunter2").unwrap();
        let b = hash_password("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("hunter2", &a));
        assert!(!verify_password("hunter3", &a));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn register_twice_is_duplicate() {
        let store = MemoryAccountStore::new();
        let account = register(&store, request("Sam@Example.com ", "pw")).await.unwrap();
        assert_eq!(account.email, "sam@example.com");
        assert_eq!(account.full_name, "Trader");
        let err = register(&store, request("sam@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateAccount));
    }

    #[tokio::test]
    async fn register_requires_email_and_password() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            register(&store, request("nobody", "pw")).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            register(&store, request("a@b.c", "")).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let store = MemoryAccountStore::new();
        let account = register(&store, request("kim@example.com", "s3cret")).await.unwrap();
        let id = authenticate(&store, "KIM@example.com", "s3cret").await.unwrap();
        assert_eq!(id, account.id);
        assert!(matches!(
            authenticate(&store, "kim@example.com", "wrong").await,
            Err(ApiError::AuthFailure)
        ));
        assert!(matches!(
            authenticate(&store, "ghost@example.com", "s3cret").await,
            Err(ApiError::AuthFailure)
        ));
    }

    #[tokio::test]
    async fn password_work_yields_the_runtime() {
        let store = MemoryAccountStore::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });
        register(&store, request("lee@example.com", "pw")).await.unwrap();
        assert!(ran.load(Ordering::SeqCst));

        ran.store(false, Ordering::SeqCst);
        let flag = ran.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });
        authenticate(&store, "lee@example.com", "pw").await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn session_round_trip_and_logout() {
        let sessions = SessionManager::new("secret", Duration::from_secs(60));
        let id = AccountId("acc-1".to_string());
        let token = sessions.open(&id).unwrap();
        assert_eq!(sessions.current_account(Some(&token)).unwrap(), id);
        sessions.close(&token);
        assert!(matches!(
            sessions.current_account(Some(&token)),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn foreign_or_missing_tokens_are_rejected() {
        let ours = SessionManager::new("secret", Duration::from_secs(60));
        let theirs = SessionManager::new("other", Duration::from_secs(60));
        let id = AccountId("acc-1".to_string());
        let forged = theirs.open(&id).unwrap();
        assert!(ours.current_account(Some(&forged)).is_err());
        assert!(ours.current_account(None).is_err());
        assert!(ours.current_account(Some("garbage")).is_err());
    }

    #[test]
    fn expired_sessions_are_pruned() {
        let sessions = SessionManager::new("secret", Duration::ZERO);
        let last = (0..100)
            .map(|i| sessions.open(&AccountId(format!("acc-{}", i))).unwrap())
            .last()
            .unwrap();
        assert_eq!(sessions.live_sessions(), 1);
        assert!(sessions.current_account(Some(&last)).is_err());

        let lasting = SessionManager::new("secret", Duration::from_secs(60));
        for i in 0..3 {
            lasting.open(&AccountId(format!("acc-{}", i))).unwrap();
        }
        assert_eq!(lasting.live_sessions(), 3);
    }
}
