//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, TokenClaims, User},
    repository::Repository,
};

/// Hash a password with argon2id and a random salt (PHC string format)
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored digest. Malformed digests never match.
pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Issue a signed access token; `ttl_minutes` defaults to the configured expiry
    pub fn issue_token(&self, subject: &str, role: Role, ttl_minutes: Option<i64>) -> AppResult<String> {
        TokenClaims::new(
            subject,
            role,
            ttl_minutes.unwrap_or(self.config.jwt_expiration_minutes),
        )
        .create_token(&self.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify signature and expiry; `None` on any failure
    pub fn verify_token(&self, token: &str) -> Option<TokenClaims> {
        TokenClaims::from_token(token, &self.config.jwt_secret)
    }

    /// Resolve the caller behind a bearer token
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self
            .verify_token(token)
            .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;

        if claims.sub.is_empty() {
            return Err(AppError::Authentication("Invalid token subject".to_string()));
        }

        match self.repository.users.get_by_username(&claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Authentication("Inactive or missing user".to_string())),
        }
    }

    /// Register a new member account
    pub async fn register(&self, request: &RegisterUser) -> AppResult<User> {
        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                request.username
            )));
        }

        let hashed = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.username, request.full_name.as_deref(), Role::Member, &hashed)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Registered new member");
        Ok(user)
    }

    /// Check credentials and return an access token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<String> {
        let invalid = || AppError::Authentication("Incorrect username or password".to_string());

        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.hashed_password) {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(invalid());
        }

        if !user.is_active {
            return Err(AppError::Authentication("Account is inactive".to_string()));
        }

        self.issue_token(&user.username, user.role, None)
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn update_role(&self, user_id: i32, role: Role) -> AppResult<User> {
        let user = self.repository.users.update_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, "Changed user role");
        Ok(user)
    }

    /// Create the bootstrap administrator if the username is still free
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AppResult<()> {
        if self.repository.users.username_exists(username).await? {
            return Ok(());
        }

        let hashed = hash_password(password)?;
        match self
            .repository
            .users
            .create(username, Some("Administrator"), Role::Admin, &hashed)
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Seeded administrator account '{}'", username);
                Ok(())
            }
            // Another instance seeded it first
            Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let digest = hash_password("correct horse").unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("correct horse", &digest));
        assert!(!verify_password("battery staple", &digest));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_digest_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }
}
