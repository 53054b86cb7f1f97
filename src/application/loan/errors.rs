use crate::domain::{IssueBookError, ReturnBookError};
use crate::ports::LedgerError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 利用者が存在しない
    #[error("User not found")]
    UserNotFound,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 貸出のビジネスルール違反
    #[error(transparent)]
    IssueRejected(#[from] IssueBookError),

    /// 返却のビジネスルール違反
    #[error(transparent)]
    ReturnRejected(#[from] ReturnBookError),

    /// 貸出台帳のエラー
    #[error("Ledger store error")]
    LedgerStoreError(#[source] LedgerError),

    /// BookCatalogのエラー
    #[error("Book catalog error")]
    BookCatalogError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// UserDirectoryのエラー
    #[error("User directory error")]
    UserDirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
