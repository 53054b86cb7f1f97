use thiserror::Error;

/// 貸出のエラー
///
/// 対象の書籍に未返却の貸出が既にある場合に発生する。
/// どちらの場合も状態は変更されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IssueBookError {
    /// 同じ利用者に貸出中
    #[error("This book is already issued to you")]
    AlreadyIssuedToRequester,
    /// 他の利用者に貸出中
    #[error("This book is currently issued to another user")]
    IssuedToAnotherUser,
}

/// 返却のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReturnBookError {
    /// 未返却の貸出が存在しない
    #[error("The book is not currently issued")]
    NotIssued,
    /// 貸出を受けた利用者ではない
    #[error("The book was not issued to this user and cannot be returned")]
    NotOwner,
    /// 既に返却済み
    #[error("The book has already been returned")]
    AlreadyReturned,
}
