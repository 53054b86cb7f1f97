use crate::domain::{
    book::{Book, NewBook},
    value_objects::{AuthorId, BookId, LocationId},
};
use crate::ports::book_catalog::{BookCatalog as BookCatalogTrait, DeleteOutcome, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        author_id: AuthorId::from_uuid(row.try_get("author_id")?),
        location_id: LocationId::from_uuid(row.try_get("location_id")?),
        is_checked_out: row.try_get("is_checked_out")?,
        book_type: row.try_get("book_type")?,
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL implementation of BookCatalog
///
/// Never writes `is_checked_out` except to insert new books as available.
pub struct BookCatalog {
    pool: PgPool,
}

impl BookCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookCatalogTrait for BookCatalog {
    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author_id, location_id, is_checked_out, book_type, created_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author_id, location_id, is_checked_out, book_type, created_at
            FROM books
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn find_book_by_title(&self, title: &str) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author_id, location_id, is_checked_out, book_type, created_at
            FROM books
            WHERE title = $1
            LIMIT 1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// Resolve author and location by name (creating them on first use) and
    /// insert the book, all in one transaction.
    async fn create_book(&self, new_book: NewBook) -> Result<Book> {
        let mut tx = self.pool.begin().await?;

        // ON CONFLICT ... DO UPDATE so RETURNING yields the id either way
        let author_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO authors (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(AuthorId::new().value())
        .bind(&new_book.author_name)
        .fetch_one(&mut *tx)
        .await?;

        let location_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO locations (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(LocationId::new().value())
        .bind(&new_book.location_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author_id, location_id, is_checked_out, book_type, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            "#,
        )
        .bind(new_book.book_id.value())
        .bind(&new_book.title)
        .bind(author_id)
        .bind(location_id)
        .bind(&new_book.book_type)
        .bind(new_book.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Book {
            book_id: new_book.book_id,
            title: new_book.title,
            author_id: AuthorId::from_uuid(author_id),
            location_id: LocationId::from_uuid(location_id),
            is_checked_out: false,
            book_type: new_book.book_type,
            created_at: new_book.created_at,
        })
    }

    /// Lock the book row, the same lock `create_loan` takes, then refuse to
    /// delete while a loan is open. Closed loans go with the book via
    /// `ON DELETE CASCADE`.
    async fn delete_book(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<bool> =
            sqlx::query_scalar("SELECT is_checked_out FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let has_open_loan: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM issued_books
                WHERE book_id = $1 AND return_date IS NULL
            )
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&mut *tx)
        .await?;
        if has_open_loan {
            return Ok(DeleteOutcome::HasOpenLoan);
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}
