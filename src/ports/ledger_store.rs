use crate::domain::{
    loan::Loan,
    value_objects::{BookId, LoanId, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 貸出台帳のエラー
///
/// 検索で見つからないことは Backend ではなく専用のバリアントで表す。
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 書籍に未返却の貸出がない
    #[error("No open loan for book {0}")]
    OpenLoanNotFound(BookId),

    /// 書籍に未返却の貸出が既にある
    #[error("Book {0} already has an open loan")]
    OpenLoanExists(BookId),

    /// 書籍が存在しない
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// 利用者が存在しない
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// 貸出記録が存在しない
    #[error("Loan {0} not found")]
    LoanNotFound(LoanId),

    /// 永続化層の障害（接続断、制約違反、トランザクション中断など）
    #[error("Ledger backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// 貸出台帳ポート
///
/// 貸出記録の永続化を抽象化する。
/// create_loan と close_loan は貸出記録と書籍の貸出中フラグを
/// 1つの作業単位で更新し、両方が確定するか両方が取り消されるかのどちらか。
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 書籍の未返却の貸出を取得する
    ///
    /// late_fee には現時点までの延滞料金の見込み額が入る。
    async fn find_open_loan(&self, book_id: BookId) -> Result<Option<Loan>>;

    /// 未返却の貸出をすべて取得する（貸出日の古い順）
    ///
    /// それぞれに延滞料金の見込み額が入る。
    async fn list_open_loans(&self) -> Result<Vec<Loan>>;

    /// 貸出記録を作成し、書籍を貸出中にする
    ///
    /// # エラー
    /// - BookNotFound: 書籍が存在しない
    /// - UserNotFound: 利用者が存在しない
    /// - OpenLoanExists: 書籍に未返却の貸出が既にある
    async fn create_loan(&self, loan: &Loan) -> Result<()>;

    /// 指定した貸出を返却済みにし、書籍を貸出可能に戻す
    ///
    /// 閉じるのは loan_id の貸出だけ。確認した時点の貸出が既に返却され、
    /// 別の利用者に貸し出し直されていても、その新しい貸出には触れない。
    /// 返却時点の延滞料金を確定させ、返却済みの貸出を返す。
    ///
    /// # エラー
    /// - OpenLoanNotFound: loan_id が書籍の未返却の貸出ではない
    /// - BookNotFound: 書籍が存在しない
    async fn close_loan(
        &self,
        book_id: BookId,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> Result<Loan>;

    /// 管理用：貸出記録を削除する
    ///
    /// 貸出プロトコルの外側の操作。未返却の貸出を削除した場合は
    /// 同じ作業単位で書籍の貸出中フラグも下ろす。
    async fn delete_loan(&self, loan_id: LoanId) -> Result<()>;
}
