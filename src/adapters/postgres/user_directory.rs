use crate::domain::{user::User, value_objects::UserId};
use crate::ports::book_catalog::DeleteOutcome;
use crate::ports::user_directory::{Result, UserDirectory as UserDirectoryTrait};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

fn map_row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        user_id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        standard: row.try_get("standard")?,
    })
}

/// PostgreSQL implementation of UserDirectory
pub struct UserDirectory {
    pool: PgPool,
}

impl UserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectoryTrait for UserDirectory {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, standard FROM users WHERE id = $1")
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, standard FROM users ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_user).collect()
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name, standard) VALUES ($1, $2, $3)")
            .bind(user.user_id.value())
            .bind(&user.name)
            .bind(&user.standard)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// `FOR UPDATE` conflicts with the key-share lock an `issued_books` insert
    /// takes on its user row, so an issue in flight either commits before the
    /// open-loan check below or fails its foreign key after this commits.
    async fn delete_user(&self, user_id: UserId) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let has_open_loan: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM issued_books
                WHERE user_id = $1 AND return_date IS NULL
            )
            "#,
        )
        .bind(user_id.value())
        .fetch_one(&mut *tx)
        .await?;
        if has_open_loan {
            return Ok(DeleteOutcome::HasOpenLoan);
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}
