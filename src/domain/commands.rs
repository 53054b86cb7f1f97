use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBook {
    pub book_id: BookId,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
    pub user_id: UserId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：書籍を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBook {
    pub title: String,
    pub author_name: String,
    pub location_name: String,
    pub book_type: String,
}

/// コマンド：利用者を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub name: String,
    pub standard: String,
}
