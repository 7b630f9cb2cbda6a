// security/src/lib.rs
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use lib::config::AuthConfig;
use lib::errors::StrokeError;
use lib::storage_engine::UserStorageEngine;
use models::errors::{FieldError, ValidationError};
use models::medical::{Login, NewUser, Role, User, UserProfile};
use models::validation::{normalize_email, sanitize_input};

pub mod middleware;
pub mod roles;

pub use middleware::AuthenticatedUser;
pub use roles::RolesConfig;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Claims for JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken("malformed subject".to_string()))
    }
}

/// Custom authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User with email {0} already exists")]
    UserExists(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing or invalid authorization header")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Permission denied: {0} required")]
    Forbidden(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
    #[error("JWT error: {0}")]
    JwtError(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StrokeError),
}

/// Hashes a password using Argon2, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHashError(format!("Failed to hash password with Argon2: {}", e)))
}

/// Verifies a password against an Argon2 hash. A wrong password is
/// `Ok(false)`; a corrupt hash is an error.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AuthError> {
    let password_hash = PasswordHash::new(hashed_password)
        .map_err(|e| AuthError::PasswordHashError(format!("Failed to parse Argon2 password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &password_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHashError(format!("Failed to verify Argon2 password: {}", e))),
    }
}

/// Issues and checks HS256 tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl JwtManager {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        JwtManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_hours.max(1) as u64 * 60 * 60,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = issued_at.timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.full_name.clone(),
            role: user.role,
            iat,
            exp: iat + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::JwtError(format!("Failed to encode JWT: {}", e)))
    }

    /// Decodes and validates a JWT token.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Accounts, tokens and permissions.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStorageEngine>,
    jwt: JwtManager,
    roles: Arc<RolesConfig>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStorageEngine>, jwt: JwtManager, roles: RolesConfig) -> Self {
        AuthService {
            users,
            jwt,
            roles: Arc::new(roles),
        }
    }

    pub fn from_config(users: Arc<dyn UserStorageEngine>, config: &AuthConfig) -> anyhow::Result<Self> {
        let roles = RolesConfig::load(config.roles_file.as_deref())?;
        let jwt = JwtManager::new(&config.jwt_secret, config.token_ttl_hours);
        Ok(Self::new(users, jwt, roles))
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    pub fn roles(&self) -> &RolesConfig {
        &self.roles
    }

    /// Fails with `Forbidden` unless the token's role grants `permission`.
    pub fn authorize(&self, claims: &Claims, permission: &str) -> Result<(), AuthError> {
        if self.roles.has_permission(claims.role, permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(permission.to_string()))
        }
    }

    /// Checks credentials and returns a token. Unknown, inactive and wrong
    /// password all fail the same way.
    pub async fn login(&self, login: &Login) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(&login.email)?;
        let mut user = self
            .users
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active || !verify_password(&login.password, &user.password_hash)? {
            warn!("Failed login for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.jwt.issue(&user)?;
        let now = Utc::now();
        user.last_login = Some(now);
        user.updated_at = now;
        self.users.update_user(&user).await?;
        info!("User {} logged in", user.email);

        Ok(LoginResponse {
            token: access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.ttl_secs(),
            user: user.profile(),
        })
    }

    /// Creates an account. The caller is responsible for checking that the
    /// requester may manage users.
    pub async fn register(&self, new_user: NewUser) -> Result<UserProfile, AuthError> {
        let mut errors = Vec::new();
        let email = normalize_email(&new_user.email)
            .map_err(|e| errors.extend(e.field_errors()))
            .ok();
        let name = sanitize_input(new_user.name.trim()).trim().to_string();
        if name.is_empty() {
            errors.push(FieldError::new("name", "name is required"));
        }
        if new_user.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(FieldError::new(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }
        let email = match email {
            Some(email) if errors.is_empty() => email,
            _ => return Err(ValidationError::Fields(errors).into()),
        };

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists(email));
        }

        let role = new_user.role.unwrap_or_default();
        let user = User::new(email, name, hash_password(&new_user.password)?, role);
        self.users.add_user(&user).await.map_err(|e| match e {
            StrokeError::AlreadyExists(_) => AuthError::UserExists(user.email.clone()),
            other => AuthError::Storage(other),
        })?;
        info!("Registered user {} with role {}", user.email, user.role);
        Ok(user.profile())
    }

    /// The account behind a token. Tokens of deleted or deactivated users
    /// are rejected.
    pub async fn current_user(&self, claims: &Claims) -> Result<UserProfile, AuthError> {
        let id = claims.user_id()?;
        match self.users.get_user_by_id(&id).await? {
            Some(user) if user.is_active => Ok(user.profile()),
            _ => Err(AuthError::InvalidToken("user no longer exists".to_string())),
        }
    }

    /// Creates the configured admin account when there are no users yet.
    pub async fn ensure_default_admin(&self, config: &AuthConfig) -> Result<bool, AuthError> {
        if !config.seed_default_admin || self.users.count_users().await? > 0 {
            return Ok(false);
        }
        let admin = NewUser {
            email: config.default_admin_email.clone(),
            password: config.default_admin_password.clone(),
            name: config.default_admin_name.clone(),
            role: Some(Role::Admin),
        };
        let profile = self.register(admin).await?;
        warn!("Created default admin {}; change its password", profile.email);
        Ok(true)
    }
}
