use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    BookId, UserId,
    book::Book,
    commands::{IssueBook, RegisterBook, RegisterUser, ReturnBook},
    events::BookReturned,
    loan::Loan,
    user::User,
};

// ============================================================================
// Requests
// ============================================================================

/// 貸出・返却リクエスト（POST /books/issue と POST /books/return）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookLoanRequest {
    pub book_id: Uuid,
    pub user_id: Uuid,
}

impl BookLoanRequest {
    pub fn to_issue_command(&self, issued_at: DateTime<Utc>) -> IssueBook {
        IssueBook {
            book_id: BookId::from_uuid(self.book_id),
            user_id: UserId::from_uuid(self.user_id),
            issued_at,
        }
    }

    pub fn to_return_command(&self, returned_at: DateTime<Utc>) -> ReturnBook {
        ReturnBook {
            book_id: BookId::from_uuid(self.book_id),
            user_id: UserId::from_uuid(self.user_id),
            returned_at,
        }
    }
}

/// 書籍登録リクエスト（POST /books）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author_name: String,
    pub location_name: String,
    pub book_type: String,
}

impl From<CreateBookRequest> for RegisterBook {
    fn from(req: CreateBookRequest) -> Self {
        Self {
            title: req.title,
            author_name: req.author_name,
            location_name: req.location_name,
            book_type: req.book_type,
        }
    }
}

/// 利用者登録リクエスト（POST /users）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default)]
    pub standard: String,
}

impl From<CreateUserRequest> for RegisterUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            name: req.name,
            standard: req.standard,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// 貸出記録
///
/// 未返却の貸出では late_fees は現時点での見込み額。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedBookResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub issue_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub late_fees: f64,
}

impl From<Loan> for IssuedBookResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.loan_id.value(),
            book_id: loan.book_id.value(),
            user_id: loan.user_id.value(),
            issue_date: loan.issued_at,
            return_date: loan.returned_at,
            late_fees: loan.late_fee,
        }
    }
}

/// POST /books/issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookIssuedResponse {
    pub message: String,
    pub issued_book: IssuedBookResponse,
}

/// POST /books/return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookReturnedResponse {
    pub message: String,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub late_fees: f64,
}

impl From<BookReturned> for BookReturnedResponse {
    fn from(event: BookReturned) -> Self {
        Self {
            message: "Book returned successfully.".to_string(),
            book_id: event.book_id.value(),
            user_id: event.user_id.value(),
            late_fees: event.late_fee,
        }
    }
}

/// GET /books/issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedBooksResponse {
    pub issued_books: Vec<IssuedBookResponse>,
}

/// GET /books/issue/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedBookEnvelope {
    pub issued_book: IssuedBookResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub location_id: Uuid,
    pub is_checked_out: bool,
    pub book_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.book_id.value(),
            title: book.title,
            author_id: book.author_id.value(),
            location_id: book.location_id.value(),
            is_checked_out: book.is_checked_out,
            book_type: book.book_type,
            created_at: book.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub standard: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id.value(),
            name: user.name,
            standard: user.standard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// エラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 機械可読なエラーコード（例: "NOT_OWNER"）
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
