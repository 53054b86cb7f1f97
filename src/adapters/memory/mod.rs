//! In-memory backend for the library ports.
//!
//! A single [`InMemoryLibrary`] implements `LedgerStore`, `BookCatalog` and
//! `UserDirectory` over one shared state, so a loan row and its book's
//! checked-out flag always change under the same lock.

pub mod book_catalog;
pub mod ledger_store;
pub mod user_directory;

use crate::domain::{
    book::Book,
    loan::Loan,
    policy::LoanPolicy,
    user::User,
    value_objects::{AuthorId, BookId, LocationId, UserId},
};
use crate::ports::LedgerError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Write step at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Writing the loan row (insert on issue, update on return).
    LoanRecord,
    /// Flipping the book's checked-out flag.
    BookFlag,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LibraryState {
    pub(crate) books: HashMap<BookId, Book>,
    pub(crate) authors: HashMap<String, AuthorId>,
    pub(crate) locations: HashMap<String, LocationId>,
    pub(crate) users: HashMap<UserId, User>,
    /// Insertion order is preserved.
    pub(crate) loans: Vec<Loan>,
}

impl LibraryState {
    pub(crate) fn open_loan(&self, book_id: BookId) -> Option<&Loan> {
        self.loans
            .iter()
            .find(|loan| loan.book_id == book_id && loan.is_open())
    }
}

/// Staged copy of the state, published only by [`UnitOfWork::commit`].
///
/// Dropping it without committing discards every staged change.
pub(crate) struct UnitOfWork<'a> {
    guard: MutexGuard<'a, LibraryState>,
    staged: LibraryState,
}

impl UnitOfWork<'_> {
    pub(crate) fn state(&mut self) -> &mut LibraryState {
        &mut self.staged
    }

    pub(crate) fn commit(self) {
        let UnitOfWork { mut guard, staged } = self;
        *guard = staged;
    }
}

/// In-memory library backend.
///
/// Cloning shares the same underlying state.
#[derive(Clone)]
pub struct InMemoryLibrary {
    state: Arc<Mutex<LibraryState>>,
    injected_failure: Arc<Mutex<Option<FailurePoint>>>,
    policy: LoanPolicy,
}

impl InMemoryLibrary {
    pub fn new(policy: LoanPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(LibraryState::default())),
            injected_failure: Arc::new(Mutex::new(None)),
            policy,
        }
    }

    /// Make the next write at `point` fail inside its unit of work.
    pub async fn fail_next_write(&self, point: FailurePoint) {
        *self.injected_failure.lock().await = Some(point);
    }

    /// Every loan ever recorded for a book, open or closed, in insertion order.
    pub async fn loan_history(&self, book_id: BookId) -> Vec<Loan> {
        self.state
            .lock()
            .await
            .loans
            .iter()
            .filter(|loan| loan.book_id == book_id)
            .cloned()
            .collect()
    }

    pub(crate) fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    pub(crate) async fn read(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().await
    }

    pub(crate) async fn begin(&self) -> UnitOfWork<'_> {
        let guard = self.state.lock().await;
        let staged = guard.clone();
        UnitOfWork { guard, staged }
    }

    pub(crate) async fn check_injected_failure(
        &self,
        point: FailurePoint,
    ) -> Result<(), LedgerError> {
        let mut injected = self.injected_failure.lock().await;
        if *injected == Some(point) {
            *injected = None;
            return Err(LedgerError::Backend(
                format!("injected failure at {:?}", point).into(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new(LoanPolicy::default())
    }
}
