use crate::domain::{
    BookReturned, IssueBookError, ReturnBookError,
    commands::*,
    loan::{self, Loan},
    policy,
    value_objects::*,
};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};

/// サービスの依存関係
///
/// 起動時に組み立てて明示的に渡す。グローバルな接続ハンドルは持たない。
/// 振る舞い（メソッド）は持たず、関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub ledger_store: Arc<dyn LedgerStore>,
    pub book_catalog: Arc<dyn BookCatalog>,
    pub user_directory: Arc<dyn UserDirectory>,
}

/// 書籍と利用者の存在確認
async fn ensure_book_and_user_exist(
    deps: &ServiceDependencies,
    book_id: BookId,
    user_id: UserId,
) -> Result<()> {
    let book = deps
        .book_catalog
        .get_book(book_id)
        .await
        .map_err(LoanApplicationError::BookCatalogError)?;

    if book.is_none() {
        return Err(LoanApplicationError::BookNotFound);
    }

    let user = deps
        .user_directory
        .get_user(user_id)
        .await
        .map_err(LoanApplicationError::UserDirectoryError)?;

    if user.is_none() {
        return Err(LoanApplicationError::UserNotFound);
    }

    Ok(())
}

/// 台帳への書き込みで競合した場合に、現在の貸出から競合理由を決める
async fn classify_issue_conflict(
    deps: &ServiceDependencies,
    cmd: &IssueBook,
) -> LoanApplicationError {
    match deps.ledger_store.find_open_loan(cmd.book_id).await {
        Ok(current) => match policy::can_issue(current.as_ref(), cmd.user_id) {
            Err(rejection) => rejection.into(),
            // 競合相手の貸出が既に返却されている
            Ok(()) => IssueBookError::IssuedToAnotherUser.into(),
        },
        Err(e) => LoanApplicationError::LedgerStoreError(e),
    }
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 書籍と利用者が存在すること
/// - 書籍に未返却の貸出がないこと
///   - 同じ利用者に貸出中なら AlreadyIssuedToRequester
///   - 他の利用者に貸出中なら IssuedToAnotherUser
///
/// 貸出記録の作成と書籍の貸出中フラグの更新は台帳の1つの作業単位で行う。
/// 同じ書籍への同時の貸出は1件だけが成功し、残りは競合として返る。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 貸出コマンド
///
/// # 戻り値
/// 作成された貸出
pub async fn issue_book(deps: &ServiceDependencies, cmd: IssueBook) -> Result<Loan> {
    // 1. 書籍・利用者の存在確認
    ensure_book_and_user_exist(deps, cmd.book_id, cmd.user_id).await?;

    // 2. 未返却の貸出を確認
    let existing = deps
        .ledger_store
        .find_open_loan(cmd.book_id)
        .await
        .map_err(LoanApplicationError::LedgerStoreError)?;

    if let Err(rejection) = policy::can_issue(existing.as_ref(), cmd.user_id) {
        tracing::warn!(
            book_id = %cmd.book_id,
            user_id = %cmd.user_id,
            reason = %rejection,
            "issue rejected"
        );
        return Err(rejection.into());
    }

    // 3. ドメイン層の純粋関数で貸出を生成
    let new_loan = loan::issue_loan(cmd.book_id, cmd.user_id, cmd.issued_at);

    // 4. 台帳に保存（貸出記録 + 貸出中フラグ）
    match deps.ledger_store.create_loan(&new_loan).await {
        Ok(()) => {}
        Err(LedgerError::OpenLoanExists(_)) => {
            tracing::warn!(book_id = %cmd.book_id, "issue lost a concurrent race");
            return Err(classify_issue_conflict(deps, &cmd).await);
        }
        Err(LedgerError::BookNotFound(_)) => return Err(LoanApplicationError::BookNotFound),
        Err(LedgerError::UserNotFound(_)) => return Err(LoanApplicationError::UserNotFound),
        Err(e) => return Err(LoanApplicationError::LedgerStoreError(e)),
    }

    tracing::info!(
        loan_id = %new_loan.loan_id,
        book_id = %new_loan.book_id,
        user_id = %new_loan.user_id,
        "book issued"
    );

    Ok(new_loan)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 書籍に未返却の貸出があること（NotIssued）
/// - 貸出を受けた本人からの返却であること（NotOwner）
/// - 延滞料金は返却時点の連続日数で確定する
///
/// 返却日・延滞料金の記録と書籍の貸出中フラグの解除は台帳の1つの作業単位で行う。
/// 閉じるのは手順2で本人のものと確認した貸出だけで、その間に返却・再貸出が
/// 起きていれば NotIssued になる。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 返却コマンド
///
/// # 戻り値
/// 確定した延滞料金を含む返却結果
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<BookReturned> {
    // 1. 未返却の貸出を取得
    let open_loan = deps
        .ledger_store
        .find_open_loan(cmd.book_id)
        .await
        .map_err(LoanApplicationError::LedgerStoreError)?;

    // 2. 返却可能か判定
    if let Err(rejection) = policy::can_return(open_loan.as_ref(), cmd.user_id) {
        tracing::warn!(
            book_id = %cmd.book_id,
            user_id = %cmd.user_id,
            reason = %rejection,
            "return rejected"
        );
        return Err(rejection.into());
    }
    let checked_loan_id = open_loan
        .map(|loan| loan.loan_id)
        .ok_or(LoanApplicationError::from(ReturnBookError::NotIssued))?;

    // 3. 確認した貸出だけを台帳で返却済みにする
    let closed = match deps
        .ledger_store
        .close_loan(cmd.book_id, checked_loan_id, cmd.returned_at)
        .await
    {
        Ok(closed) => closed,
        // 判定後にその貸出が返却された
        Err(LedgerError::OpenLoanNotFound(_)) => {
            tracing::warn!(
                book_id = %cmd.book_id,
                loan_id = %checked_loan_id,
                "loan changed before return"
            );
            return Err(ReturnBookError::NotIssued.into());
        }
        Err(e) => return Err(LoanApplicationError::LedgerStoreError(e)),
    };

    tracing::info!(
        loan_id = %closed.loan_id,
        book_id = %closed.book_id,
        user_id = %closed.user_id,
        late_fee = closed.late_fee,
        "book returned"
    );

    Ok(BookReturned {
        loan_id: closed.loan_id,
        book_id: closed.book_id,
        user_id: closed.user_id,
        returned_at: cmd.returned_at,
        late_fee: closed.late_fee,
    })
}

/// 未返却の貸出一覧（延滞料金の見込み額付き）
pub async fn list_issued_books(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    deps.ledger_store
        .list_open_loans()
        .await
        .map_err(LoanApplicationError::LedgerStoreError)
}

/// 書籍の未返却の貸出を取得する
///
/// 貸出中でなければ LoanNotFound。
pub async fn get_issued_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Loan> {
    deps.ledger_store
        .find_open_loan(book_id)
        .await
        .map_err(LoanApplicationError::LedgerStoreError)?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 管理用：貸出記録を削除する
pub async fn delete_loan_record(deps: &ServiceDependencies, loan_id: LoanId) -> Result<()> {
    match deps.ledger_store.delete_loan(loan_id).await {
        Ok(()) => {
            tracing::info!(loan_id = %loan_id, "loan record deleted");
            Ok(())
        }
        Err(LedgerError::LoanNotFound(_)) => Err(LoanApplicationError::LoanNotFound),
        Err(e) => Err(LoanApplicationError::LedgerStoreError(e)),
    }
}
