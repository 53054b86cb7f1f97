use thiserror::Error;

/// 蔵書・利用者管理のエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("A book with this title already exists")]
    DuplicateTitle,

    #[error("Book not found")]
    BookNotFound,

    #[error("User not found")]
    UserNotFound,

    /// 貸出中の書籍は削除できない
    #[error("Book is currently issued")]
    BookCheckedOut,

    /// 未返却の貸出がある利用者は削除できない
    #[error("User has books that are not returned")]
    UserHasOpenLoans,

    #[error("Book catalog error")]
    BookCatalogError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("User directory error")]
    UserDirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
