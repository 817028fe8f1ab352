//! Authentication service for login and token management
//!
//! Staff accounts are created by an admin; a one-time bootstrap creates the
//! first admin while the users table is still empty.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::models::{Role, User};
use shared::validation::{validate_email, validate_required};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for logging in
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for refreshing an access token
#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// Input for creating a staff account
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User row from the database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let role = Role::from_str(&self.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role: {}", self.role)))?;
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, role, is_active, created_at, updated_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Create the first admin account. Only works while no users exist.
    pub async fn bootstrap_admin(&self, input: CreateUserInput) -> AppResult<User> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        if count > 0 {
            return Err(AppError::Conflict {
                resource: "users".to_string(),
                message: "Bootstrap is only available on an empty installation".to_string(),
            });
        }

        self.insert_user(CreateUserInput {
            role: Role::Admin,
            ..input
        })
        .await
    }

    /// Create a staff account (admin only; enforced by the handler)
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        self.insert_user(input).await
    }

    async fn insert_user(&self, input: CreateUserInput) -> AppResult<User> {
        validate_email(&input.email).map_err(|msg| AppError::validation("email", msg))?;
        validate_required(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        if input.password.len() < 8 {
            return Err(AppError::validation(
                "password",
                "Password must be at least 8 characters",
            ));
        }

        let duplicate =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&input.email)
                .fetch_one(&self.db)
                .await?;
        if duplicate {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.email)
        .bind(&input.name)
        .bind(&password_hash)
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        row.into_user()
    }

    /// Verify credentials and issue a token pair
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        let row = sqlx::query_as::<_, (Uuid, String, String, bool)>(
            "SELECT id, password_hash, role, is_active FROM users WHERE email = $1",
        )
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let (user_id, password_hash, role, is_active) = row;

        if !is_active {
            return Err(AppError::InvalidCredentials);
        }

        let matches = verify(&input.password, &password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !matches {
            return Err(AppError::InvalidCredentials);
        }

        let role = Role::from_str(&role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role: {}", role)))?;

        self.issue_tokens(user_id, role)
    }

    /// Exchange a refresh token for a fresh pair
    pub async fn refresh(&self, input: RefreshInput) -> AppResult<AuthTokens> {
        let claims = self.decode_token(&input.refresh_token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        let row = sqlx::query_as::<_, (String, bool)>(
            "SELECT role, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        if !row.1 {
            return Err(AppError::InvalidToken);
        }

        let role = Role::from_str(&row.0)
            .ok_or_else(|| AppError::Internal(format!("Unknown role: {}", row.0)))?;

        self.issue_tokens(user_id, role)
    }

    /// Current user's account record
    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        row.into_user()
    }

    /// List staff accounts (admin only; enforced by the handler)
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    fn issue_tokens(&self, user_id: Uuid, role: Role) -> AppResult<AuthTokens> {
        let access_token = self.encode_token(user_id, role, self.access_token_expiry)?;
        let refresh_token = self.encode_token(user_id, role, self.refresh_token_expiry)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn encode_token(&self, user_id: Uuid, role: Role, expiry_seconds: i64) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            permissions: role.permissions(),
            exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }
}
