use crate::domain::{
    loan::{self, Loan},
    policy::LoanPolicy,
    value_objects::{BookId, LoanId, UserId},
};
use crate::ports::ledger_store::{LedgerError, LedgerStore as LedgerStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{TryStreamExt, future};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Backend(Box::new(err))
    }
}

/// Map a unique violation on the open-loan index to `OpenLoanExists`.
///
/// The book row is locked by then, so a foreign key violation can only come
/// from a user deleted since the existence check.
fn map_insert_error(err: sqlx::Error, new_loan: &Loan) -> LedgerError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            LedgerError::OpenLoanExists(new_loan.book_id)
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            LedgerError::UserNotFound(new_loan.user_id)
        }
        _ => err.into(),
    }
}

/// Convert an `issued_books` row into a Loan.
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        loan_id: LoanId::from_uuid(row.try_get("id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        issued_at: row.try_get("issue_date")?,
        returned_at: row.try_get("return_date")?,
        late_fee: row.try_get("late_fees")?,
    })
}

/// PostgreSQL implementation of LedgerStore
///
/// Loans live in `issued_books`; the availability flag lives on `books`.
/// Every write runs inside a `sqlx::Transaction`, which rolls back when it is
/// dropped without `commit`, so any early return leaves both tables untouched.
/// The book row is locked with `FOR UPDATE` so issue and return on the same
/// book are serialized.
pub struct LedgerStore {
    pool: PgPool,
    policy: LoanPolicy,
}

impl LedgerStore {
    /// Create a new LedgerStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool, policy: LoanPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl LedgerStoreTrait for LedgerStore {
    async fn find_open_loan(&self, book_id: BookId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT id, book_id, user_id, issue_date, return_date, late_fees
            FROM issued_books
            WHERE book_id = $1 AND return_date IS NULL
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        let now = Utc::now();
        row.as_ref()
            .map(map_row_to_loan)
            .transpose()
            .map(|loan| loan.map(|loan| loan::with_fee_preview(loan, now, &self.policy)))
    }

    async fn list_open_loans(&self) -> Result<Vec<Loan>> {
        let now = Utc::now();
        let policy = self.policy;

        sqlx::query(
            r#"
            SELECT id, book_id, user_id, issue_date, return_date, late_fees
            FROM issued_books
            WHERE return_date IS NULL
            ORDER BY issue_date ASC
            "#,
        )
        .fetch(&self.pool)
        .map_err(LedgerError::from)
        .and_then(|row| {
            future::ready(
                map_row_to_loan(&row).map(|loan| loan::with_fee_preview(loan, now, &policy)),
            )
        })
        .try_collect()
        .await
    }

    /// Insert the loan and mark the book checked out in one transaction.
    ///
    /// The partial unique index `idx_issued_books_one_open_loan` backs the
    /// single-open-loan check; hitting it also reports `OpenLoanExists`.
    async fn create_loan(&self, new_loan: &Loan) -> Result<()> {
        let book_id = new_loan.book_id;
        let mut tx = self.pool.begin().await?;

        let locked: Option<bool> =
            sqlx::query_scalar("SELECT is_checked_out FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(LedgerError::BookNotFound(book_id));
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
            return Err(LedgerError::OpenLoanExists(book_id));
        }

        sqlx::query(
            r#"
            INSERT INTO issued_books (id, book_id, user_id, issue_date, return_date, late_fees)
            VALUES ($1, $2, $3, $4, NULL, 0)
            "#,
        )
        .bind(new_loan.loan_id.value())
        .bind(book_id.value())
        .bind(new_loan.user_id.value())
        .bind(new_loan.issued_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, new_loan))?;

        sqlx::query("UPDATE books SET is_checked_out = TRUE WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Close the given loan and free the book in one transaction.
    ///
    /// Only `loan_id` is matched, so a loan issued after the caller's check is
    /// never closed by mistake. The final fee is computed here, from the
    /// locked row, at `returned_at`.
    async fn close_loan(
        &self,
        book_id: BookId,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Loan> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, book_id, user_id, issue_date, return_date, late_fees
            FROM issued_books
            WHERE id = $1 AND book_id = $2 AND return_date IS NULL
            FOR UPDATE
            "#,
        )
        .bind(loan_id.value())
        .bind(book_id.value())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::OpenLoanNotFound(book_id))?;

        let open = map_row_to_loan(&row)?;
        let closed = loan::close_loan(&open, returned_at, &self.policy)
            .ok_or(LedgerError::OpenLoanNotFound(book_id))?;

        sqlx::query("UPDATE issued_books SET return_date = $1, late_fees = $2 WHERE id = $3")
            .bind(returned_at)
            .bind(closed.late_fee)
            .bind(closed.loan_id.value())
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query("UPDATE books SET is_checked_out = FALSE WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(LedgerError::BookNotFound(book_id));
        }

        tx.commit().await?;
        Ok(closed)
    }

    async fn delete_loan(&self, loan_id: LoanId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM issued_books WHERE id = $1 RETURNING book_id, return_date",
        )
        .bind(loan_id.value())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::LoanNotFound(loan_id))?;

        let book_id: Uuid = deleted.try_get("book_id")?;
        let return_date: Option<DateTime<Utc>> = deleted.try_get("return_date")?;

        if return_date.is_none() {
            sqlx::query("UPDATE books SET is_checked_out = FALSE WHERE id = $1")
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
