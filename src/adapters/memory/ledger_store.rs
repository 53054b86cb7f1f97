use super::{FailurePoint, InMemoryLibrary};
use crate::domain::{
    loan::{self, Loan},
    value_objects::{BookId, LoanId},
};
use crate::ports::ledger_store::{LedgerError, LedgerStore, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl LedgerStore for InMemoryLibrary {
    async fn find_open_loan(&self, book_id: BookId) -> Result<Option<Loan>> {
        let now = Utc::now();
        let state = self.read().await;
        Ok(state
            .open_loan(book_id)
            .cloned()
            .map(|loan| loan::with_fee_preview(loan, now, self.policy())))
    }

    async fn list_open_loans(&self) -> Result<Vec<Loan>> {
        let now = Utc::now();
        let state = self.read().await;
        let mut loans: Vec<Loan> = state
            .loans
            .iter()
            .filter(|loan| loan.is_open())
            .cloned()
            .map(|loan| loan::with_fee_preview(loan, now, self.policy()))
            .collect();
        loans.sort_by_key(|loan| loan.issued_at);
        Ok(loans)
    }

    async fn create_loan(&self, new_loan: &Loan) -> Result<()> {
        let book_id = new_loan.book_id;
        let mut uow = self.begin().await;
        let state = uow.state();

        if !state.books.contains_key(&book_id) {
            return Err(LedgerError::BookNotFound(book_id));
        }
        if !state.users.contains_key(&new_loan.user_id) {
            return Err(LedgerError::UserNotFound(new_loan.user_id));
        }
        if state.open_loan(book_id).is_some() {
            return Err(LedgerError::OpenLoanExists(book_id));
        }

        state.loans.push(new_loan.clone());
        self.check_injected_failure(FailurePoint::LoanRecord).await?;

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or(LedgerError::BookNotFound(book_id))?;
        book.is_checked_out = true;
        self.check_injected_failure(FailurePoint::BookFlag).await?;

        uow.commit();
        Ok(())
    }

    async fn close_loan(
        &self,
        book_id: BookId,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Loan> {
        let mut uow = self.begin().await;
        let state = uow.state();

        let open = state
            .loans
            .iter_mut()
            .find(|loan| loan.loan_id == loan_id && loan.book_id == book_id)
            .ok_or(LedgerError::OpenLoanNotFound(book_id))?;
        let closed = loan::close_loan(open, returned_at, self.policy())
            .ok_or(LedgerError::OpenLoanNotFound(book_id))?;
        *open = closed.clone();
        self.check_injected_failure(FailurePoint::LoanRecord).await?;

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or(LedgerError::BookNotFound(book_id))?;
        book.is_checked_out = false;
        self.check_injected_failure(FailurePoint::BookFlag).await?;

        uow.commit();
        Ok(closed)
    }

    async fn delete_loan(&self, loan_id: LoanId) -> Result<()> {
        let mut uow = self.begin().await;
        let state = uow.state();

        let position = state
            .loans
            .iter()
            .position(|loan| loan.loan_id == loan_id)
            .ok_or(LedgerError::LoanNotFound(loan_id))?;
        let removed = state.loans.remove(position);

        if removed.is_open() {
            if let Some(book) = state.books.get_mut(&removed.book_id) {
                book.is_checked_out = false;
            }
        }

        uow.commit();
        Ok(())
    }
}
