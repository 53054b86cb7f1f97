use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, UserId};

/// イベント：書籍が返却された
///
/// 返却処理の結果として呼び出し元に返される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookReturned {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub returned_at: DateTime<Utc>,
    pub late_fee: f64,
}
