// Data-access collaborators for users and roles

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::auth::models::{NewUser, Role, User, UserWithRole};
use crate::error::StoreError;

/// User store capability
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive email match
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Exact email match joined with the user's role
    async fn find_by_email_with_role(&self, email: &str)
        -> Result<Option<UserWithRole>, StoreError>;

    async fn find_by_pk(&self, id: i32) -> Result<Option<User>, StoreError>;

    /// Insert a user. Duplicate emails fail with `StoreError::UniqueViolation`.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
}

/// Role store capability
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    async fn find_by_pk(&self, id: i32) -> Result<Option<Role>, StoreError>;
}

const USER_COLUMNS: &str =
    "id, name, email, encrypted_password, image, role_id, created_at, updated_at";

/// PostgreSQL-backed user and role store
/// Expects `users.email` to carry a unique index
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small connection pool against `database_url`
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        tracing::debug!("Creating database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        tracing::info!("Database connection pool created");
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema and seed the default roles
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(FromRow)]
struct UserRoleRow {
    id: i32,
    name: String,
    email: String,
    encrypted_password: String,
    image: Option<String>,
    role_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role_name: String,
}

impl From<UserRoleRow> for UserWithRole {
    fn from(row: UserRoleRow) -> Self {
        Self {
            role: Role {
                id: row.role_id,
                name: row.role_name,
            },
            user: User {
                id: row.id,
                name: row.name,
                email: row.email,
                encrypted_password: row.encrypted_password,
                image: row.image,
                role_id: row.role_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email_with_role(
        &self,
        email: &str,
    ) -> Result<Option<UserWithRole>, StoreError> {
        let row = sqlx::query_as::<_, UserRoleRow>(
            r#"
            SELECT u.id, u.name, u.email, u.encrypted_password, u.image, u.role_id,
                   u.created_at, u.updated_at, r.name AS role_name
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserWithRole::from))
    }

    async fn find_by_pk(&self, id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, encrypted_password, role_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.encrypted_password)
        .bind(new_user.role_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_by_pk(&self, id: i32) -> Result<Option<Role>, StoreError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }
}
