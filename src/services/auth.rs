//! Authentication service: password login, JWT issuing, bootstrap superuser

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{NewUser, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password and return a JWT
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %username, "Login for unknown user");
                AppError::Authentication("Invalid username or password".to_string())
            })?;

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login for inactive user");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        if !verify_password(&user.password, password)? {
            tracing::warn!(user_id = user.id, "Login with wrong password");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        self.repository.users.touch_last_login(user.id).await?;

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Decode a token; expired or forged tokens yield None
    pub fn claims_from_token(&self, token: &str) -> Option<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret).ok()
    }

    /// Create the configured superuser when no user exists yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<Option<User>> {
        let (Some(username), Some(password)) = (
            self.config.bootstrap_admin_username.as_deref(),
            self.config.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(None);
        };

        if self.repository.users.count().await? > 0 {
            return Ok(None);
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash: hash_password(password)?,
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                is_staff: true,
                is_superuser: true,
                permissions: Vec::new(),
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap superuser created");
        Ok(Some(user))
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
