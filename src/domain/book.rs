use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthorId, BookId, LocationId};

/// 書籍
///
/// is_checked_out は「未返却の貸出がある」ことと常に一致する。
/// このフラグを書き換えるのは貸出・返却の処理だけ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author_id: AuthorId,
    pub location_id: LocationId,
    pub is_checked_out: bool,
    pub book_type: String,
    pub created_at: DateTime<Utc>,
}

/// 登録前の書籍
///
/// 著者と配架場所は名前で指定し、カタログ側で既存のものを引くか新規作成する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub book_id: BookId,
    pub title: String,
    pub author_name: String,
    pub location_name: String,
    pub book_type: String,
    pub created_at: DateTime<Utc>,
}
