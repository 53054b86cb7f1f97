use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use library_ledger::adapters::memory::{FailurePoint, InMemoryLibrary};
use library_ledger::application::catalog::{self, CatalogError};
use library_ledger::application::loan::{self, LoanApplicationError, ServiceDependencies};
use library_ledger::domain::book::{Book, NewBook};
use library_ledger::domain::commands::{IssueBook, ReturnBook};
use library_ledger::domain::loan::{Loan, issue_loan};
use library_ledger::domain::user::User;
use library_ledger::domain::value_objects::*;
use library_ledger::domain::{IssueBookError, ReturnBookError};
use library_ledger::ports::{
    BookCatalog, DeleteOutcome, LedgerStore, UserDirectory, book_catalog, ledger_store,
    user_directory,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod common;

// ============================================================================
// ヘルパー
// ============================================================================

struct Fixture {
    library: Arc<InMemoryLibrary>,
    deps: ServiceDependencies,
    book_id: BookId,
    alice: UserId,
    bob: UserId,
}

async fn setup() -> Fixture {
    let library = Arc::new(InMemoryLibrary::default());
    let deps = common::in_memory_deps(&library);
    let book_id = common::seed_book(&deps, "A Wizard of Earthsea").await;
    let alice = common::seed_user(&deps, "Alice").await;
    let bob = common::seed_user(&deps, "Bob").await;

    Fixture {
        library,
        deps,
        book_id,
        alice,
        bob,
    }
}

fn issue_cmd(book_id: BookId, user_id: UserId) -> IssueBook {
    IssueBook {
        book_id,
        user_id,
        issued_at: Utc::now(),
    }
}

fn return_cmd(book_id: BookId, user_id: UserId) -> ReturnBook {
    ReturnBook {
        book_id,
        user_id,
        returned_at: Utc::now(),
    }
}

/// 貸出日から `days` 日後に返却したときの延滞料金
async fn fee_after_days(days: i64) -> f64 {
    let f = setup().await;
    let issued_at = Utc::now() - Duration::days(days);

    loan::issue_book(
        &f.deps,
        IssueBook {
            book_id: f.book_id,
            user_id: f.alice,
            issued_at,
        },
    )
    .await
    .unwrap();

    let returned = loan::return_book(
        &f.deps,
        ReturnBook {
            book_id: f.book_id,
            user_id: f.alice,
            returned_at: issued_at + Duration::days(days),
        },
    )
    .await
    .unwrap();

    returned.late_fee
}

// ============================================================================
// 割り込みを再現するストア
// ============================================================================

/// 最初の find_open_loan の直後に、その貸出を返却して別の利用者へ貸し出し直す
struct ReissueAfterLookup {
    inner: Arc<InMemoryLibrary>,
    next_holder: UserId,
    fired: AtomicBool,
}

#[async_trait]
impl LedgerStore for ReissueAfterLookup {
    async fn find_open_loan(&self, book_id: BookId) -> ledger_store::Result<Option<Loan>> {
        let found = self.inner.find_open_loan(book_id).await?;
        if let Some(loan) = &found {
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner
                    .close_loan(book_id, loan.loan_id, Utc::now())
                    .await?;
                self.inner
                    .create_loan(&issue_loan(book_id, self.next_holder, Utc::now()))
                    .await?;
            }
        }
        Ok(found)
    }

    async fn list_open_loans(&self) -> ledger_store::Result<Vec<Loan>> {
        self.inner.list_open_loans().await
    }

    async fn create_loan(&self, loan: &Loan) -> ledger_store::Result<()> {
        self.inner.create_loan(loan).await
    }

    async fn close_loan(
        &self,
        book_id: BookId,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> ledger_store::Result<Loan> {
        self.inner.close_loan(book_id, loan_id, returned_at).await
    }

    async fn delete_loan(&self, loan_id: LoanId) -> ledger_store::Result<()> {
        self.inner.delete_loan(loan_id).await
    }
}

/// 削除の直前に、対象の書籍を holder へ貸し出す
struct IssueBeforeBookDelete {
    inner: Arc<InMemoryLibrary>,
    holder: UserId,
}

#[async_trait]
impl BookCatalog for IssueBeforeBookDelete {
    async fn get_book(&self, book_id: BookId) -> book_catalog::Result<Option<Book>> {
        self.inner.get_book(book_id).await
    }

    async fn list_books(&self) -> book_catalog::Result<Vec<Book>> {
        self.inner.list_books().await
    }

    async fn find_book_by_title(&self, title: &str) -> book_catalog::Result<Option<Book>> {
        self.inner.find_book_by_title(title).await
    }

    async fn create_book(&self, book: NewBook) -> book_catalog::Result<Book> {
        self.inner.create_book(book).await
    }

    async fn delete_book(&self, book_id: BookId) -> book_catalog::Result<DeleteOutcome> {
        self.inner
            .create_loan(&issue_loan(book_id, self.holder, Utc::now()))
            .await?;
        self.inner.delete_book(book_id).await
    }
}

/// 削除の直前に、対象の利用者へ book_id を貸し出す
struct IssueBeforeUserDelete {
    inner: Arc<InMemoryLibrary>,
    book_id: BookId,
}

#[async_trait]
impl UserDirectory for IssueBeforeUserDelete {
    async fn get_user(&self, user_id: UserId) -> user_directory::Result<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn list_users(&self) -> user_directory::Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn create_user(&self, user: &User) -> user_directory::Result<()> {
        self.inner.create_user(user).await
    }

    async fn delete_user(&self, user_id: UserId) -> user_directory::Result<DeleteOutcome> {
        self.inner
            .create_loan(&issue_loan(self.book_id, user_id, Utc::now()))
            .await?;
        self.inner.delete_user(user_id).await
    }
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_never_issued_book_has_no_open_loan() {
    let f = setup().await;

    let open = f.deps.ledger_store.find_open_loan(f.book_id).await.unwrap();
    assert!(open.is_none());
    assert!(!common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_issue_book_success() {
    let f = setup().await;

    let issued = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    assert_eq!(issued.book_id, f.book_id);
    assert_eq!(issued.user_id, f.alice);
    assert!(issued.returned_at.is_none());
    assert_eq!(issued.late_fee, 0.0);

    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.loan_id, issued.loan_id);
    assert_eq!(open.user_id, f.alice);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_issue_book_twice_to_same_user() {
    let f = setup().await;
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::IssueRejected(
            IssueBookError::AlreadyIssuedToRequester
        ))
    ));
    assert_eq!(f.library.loan_history(f.book_id).await.len(), 1);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_issue_book_held_by_another_user() {
    let f = setup().await;
    let first = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.bob)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::IssueRejected(
            IssueBookError::IssuedToAnotherUser
        ))
    ));
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.loan_id, first.loan_id);
    assert_eq!(open.user_id, f.alice);
    assert_eq!(f.library.loan_history(f.book_id).await.len(), 1);
}

#[tokio::test]
async fn test_issue_unknown_book() {
    let f = setup().await;

    let result = loan::issue_book(&f.deps, issue_cmd(BookId::new(), f.alice)).await;
    assert!(matches!(result, Err(LoanApplicationError::BookNotFound)));
}

#[tokio::test]
async fn test_issue_to_unknown_user() {
    let f = setup().await;

    let result = loan::issue_book(&f.deps, issue_cmd(f.book_id, UserId::new())).await;

    assert!(matches!(result, Err(LoanApplicationError::UserNotFound)));
    assert!(!common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_book_can_be_reissued_after_return() {
    let f = setup().await;
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();
    loan::return_book(&f.deps, return_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let second = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.bob))
        .await
        .unwrap();

    assert_eq!(second.user_id, f.bob);
    let history = f.library.loan_history(f.book_id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|l| l.is_open()).count(), 1);
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_book_success() {
    let f = setup().await;
    let issued = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let returned = loan::return_book(&f.deps, return_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    assert_eq!(returned.loan_id, issued.loan_id);
    assert_eq!(returned.book_id, f.book_id);
    assert_eq!(returned.user_id, f.alice);
    assert_eq!(returned.late_fee, 0.0);

    assert!(
        f.deps
            .ledger_store
            .find_open_loan(f.book_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(!common::is_checked_out(&f.deps, f.book_id).await);

    let history = f.library.loan_history(f.book_id).await;
    assert_eq!(history[0].returned_at, Some(returned.returned_at));
}

#[tokio::test]
async fn test_late_fee_after_twenty_days() {
    assert_eq!(fee_after_days(20).await, 10.0);
}

#[tokio::test]
async fn test_no_late_fee_within_grace_period() {
    assert_eq!(fee_after_days(10).await, 0.0);
    assert_eq!(fee_after_days(15).await, 0.0);
}

#[tokio::test]
async fn test_return_by_another_user() {
    let f = setup().await;
    let issued = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = loan::return_book(&f.deps, return_cmd(f.book_id, f.bob)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::ReturnRejected(ReturnBookError::NotOwner))
    ));
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.loan_id, issued.loan_id);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_return_book_never_issued() {
    let f = setup().await;

    let result = loan::return_book(&f.deps, return_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::ReturnRejected(ReturnBookError::NotIssued))
    ));
}

#[tokio::test]
async fn test_return_book_twice() {
    let f = setup().await;
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();
    loan::return_book(&f.deps, return_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = loan::return_book(&f.deps, return_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::ReturnRejected(ReturnBookError::NotIssued))
    ));
}

#[tokio::test]
async fn test_return_never_closes_a_loan_issued_after_the_check() {
    let f = setup().await;
    let alice_loan = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();
    let deps = ServiceDependencies {
        ledger_store: Arc::new(ReissueAfterLookup {
            inner: f.library.clone(),
            next_holder: f.bob,
            fired: AtomicBool::new(false),
        }),
        ..f.deps.clone()
    };

    let result = loan::return_book(&deps, return_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::ReturnRejected(ReturnBookError::NotIssued))
    ));

    // bob の貸出は開いたまま
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.user_id, f.bob);
    assert_ne!(open.loan_id, alice_loan.loan_id);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);

    let history = f.library.loan_history(f.book_id).await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|l| l.user_id == f.bob && l.is_open()));
}

// ============================================================================
// 同時実行
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_has_single_winner() {
    let f = setup().await;
    let mut users = Vec::new();
    for i in 0..8 {
        users.push(common::seed_user(&f.deps, &format!("Reader {i}")).await);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|&user_id| {
            let deps = f.deps.clone();
            let cmd = issue_cmd(f.book_id, user_id);
            tokio::spawn(async move { loan::issue_book(&deps, cmd).await })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(issued) => winners.push(issued),
            Err(LoanApplicationError::IssueRejected(IssueBookError::IssuedToAnotherUser)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1);
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.loan_id, winners[0].loan_id);
    assert_eq!(f.library.loan_history(f.book_id).await.len(), 1);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_by_same_user() {
    let f = setup().await;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let deps = f.deps.clone();
            let cmd = issue_cmd(f.book_id, f.alice);
            tokio::spawn(async move { loan::issue_book(&deps, cmd).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LoanApplicationError::IssueRejected(
                IssueBookError::AlreadyIssuedToRequester,
            )) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(f.library.loan_history(f.book_id).await.len(), 1);
}

// ============================================================================
// ロールバック
// ============================================================================

#[tokio::test]
async fn test_failed_issue_leaves_no_trace() {
    let f = setup().await;
    f.library.fail_next_write(FailurePoint::BookFlag).await;

    let result = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::LedgerStoreError(_))
    ));
    assert!(f.library.loan_history(f.book_id).await.is_empty());
    assert!(!common::is_checked_out(&f.deps, f.book_id).await);

    // 障害が解消すれば通常どおり貸し出せる
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_return_keeps_loan_open() {
    let f = setup().await;
    let issued = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();
    f.library.fail_next_write(FailurePoint::BookFlag).await;

    let result = loan::return_book(&f.deps, return_cmd(f.book_id, f.alice)).await;

    assert!(matches!(
        result,
        Err(LoanApplicationError::LedgerStoreError(_))
    ));
    let history = f.library.loan_history(f.book_id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].loan_id, issued.loan_id);
    assert!(history[0].returned_at.is_none());
    assert_eq!(history[0].late_fee, 0.0);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

// ============================================================================
// 照会・管理
// ============================================================================

#[tokio::test]
async fn test_list_issued_books_previews_fee() {
    let f = setup().await;
    loan::issue_book(
        &f.deps,
        IssueBook {
            book_id: f.book_id,
            user_id: f.alice,
            issued_at: Utc::now() - Duration::days(20),
        },
    )
    .await
    .unwrap();

    let issued = loan::list_issued_books(&f.deps).await.unwrap();

    assert_eq!(issued.len(), 1);
    assert!(issued[0].is_open());
    assert!(issued[0].late_fee >= 10.0);
    assert!(issued[0].late_fee < 10.1);
}

#[tokio::test]
async fn test_get_issued_book_when_not_issued() {
    let f = setup().await;

    let result = loan::get_issued_book(&f.deps, f.book_id).await;
    assert!(matches!(result, Err(LoanApplicationError::LoanNotFound)));
}

#[tokio::test]
async fn test_delete_open_loan_record_frees_book() {
    let f = setup().await;
    let issued = loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    loan::delete_loan_record(&f.deps, issued.loan_id)
        .await
        .unwrap();

    assert!(!common::is_checked_out(&f.deps, f.book_id).await);
    assert!(matches!(
        loan::delete_loan_record(&f.deps, issued.loan_id).await,
        Err(LoanApplicationError::LoanNotFound)
    ));
}

// ============================================================================
// 蔵書・利用者管理
// ============================================================================

#[tokio::test]
async fn test_register_book_rejects_duplicate_title() {
    let f = setup().await;

    let result = catalog::register_book(
        &f.deps,
        library_ledger::domain::commands::RegisterBook {
            title: "A Wizard of Earthsea".to_string(),
            author_name: "Someone Else".to_string(),
            location_name: "Shelf Z".to_string(),
            book_type: "fiction".to_string(),
        },
    )
    .await;

    assert!(matches!(result, Err(CatalogError::DuplicateTitle)));
    assert_eq!(catalog::list_books(&f.deps).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_book_while_issued() {
    let f = setup().await;
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = catalog::remove_book(&f.deps, f.book_id).await;
    assert!(matches!(result, Err(CatalogError::BookCheckedOut)));

    loan::return_book(&f.deps, return_cmd(f.book_id, f.alice))
        .await
        .unwrap();
    catalog::remove_book(&f.deps, f.book_id).await.unwrap();

    assert!(matches!(
        catalog::get_book(&f.deps, f.book_id).await,
        Err(CatalogError::BookNotFound)
    ));
    assert!(f.library.loan_history(f.book_id).await.is_empty());
}

#[tokio::test]
async fn test_remove_book_sees_issue_landing_before_delete() {
    let f = setup().await;
    let deps = ServiceDependencies {
        book_catalog: Arc::new(IssueBeforeBookDelete {
            inner: f.library.clone(),
            holder: f.alice,
        }),
        ..f.deps.clone()
    };

    let result = catalog::remove_book(&deps, f.book_id).await;

    assert!(matches!(result, Err(CatalogError::BookCheckedOut)));
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.user_id, f.alice);
    assert!(common::is_checked_out(&f.deps, f.book_id).await);
}

#[tokio::test]
async fn test_remove_user_sees_issue_landing_before_delete() {
    let f = setup().await;
    let deps = ServiceDependencies {
        user_directory: Arc::new(IssueBeforeUserDelete {
            inner: f.library.clone(),
            book_id: f.book_id,
        }),
        ..f.deps.clone()
    };

    let result = catalog::remove_user(&deps, f.bob).await;

    assert!(matches!(result, Err(CatalogError::UserHasOpenLoans)));
    assert!(catalog::get_user(&f.deps, f.bob).await.is_ok());
    let open = f
        .deps
        .ledger_store
        .find_open_loan(f.book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.user_id, f.bob);
}

#[tokio::test]
async fn test_remove_user_with_open_loan() {
    let f = setup().await;
    loan::issue_book(&f.deps, issue_cmd(f.book_id, f.alice))
        .await
        .unwrap();

    let result = catalog::remove_user(&f.deps, f.alice).await;
    assert!(matches!(result, Err(CatalogError::UserHasOpenLoans)));

    catalog::remove_user(&f.deps, f.bob).await.unwrap();
    assert!(matches!(
        catalog::remove_user(&f.deps, f.bob).await,
        Err(CatalogError::UserNotFound)
    ));
}
