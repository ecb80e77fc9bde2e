use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, first_name, last_name, email, username, password_hash, \
     is_active, is_verified, last_login, created_at, updated_at";

/// Persistence gateway for users. Every method is one unit of work against
/// the backing store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Duplicate username or email yields `AppError::Conflict`.
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Look a user up by username, or by email (case-insensitive).
    async fn find_by_username_or_email(&self, key: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Apply a partial update and bump `updated_at`.
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User>;

    /// Stamp `last_login` with the current time.
    async fn record_login(&self, id: Uuid) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, username, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)?;
        debug!(user_id = %created.id, "user row inserted");
        Ok(created)
    }

    async fn find_by_username_or_email(&self, key: &str) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE username = $1 OR email = lower($1)
            LIMIT 1
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User> {
        let sql = format!(
            r#"
            UPDATE users
               SET first_name    = COALESCE($2, first_name),
                   last_name     = COALESCE($3, last_name),
                   email         = COALESCE($4, email),
                   username      = COALESCE($5, username),
                   password_hash = COALESCE($6, password_hash),
                   updated_at    = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.email)
            .bind(changes.username)
            .bind(changes.password_hash)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)?
            .ok_or(AppError::NotFound(id))
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(id));
        }
        debug!(user_id = %id, "user row deleted");
        Ok(())
    }
}

/// Unique violations become `Conflict` naming the offending field; anything
/// else stays a store error.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => "username",
                Some(c) if c.contains("email") => "email",
                _ => "user",
            };
            return AppError::Conflict(field.to_string());
        }
    }
    AppError::Store(e)
}
