use crate::application::{catalog::CatalogError, loan::LoanApplicationError};
use crate::domain::{IssueBookError, ReturnBookError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Loan(LoanApplicationError),
    Catalog(CatalogError),
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
fn internal(
    code: &'static str,
    message: &'static str,
    err: &dyn std::error::Error,
) -> (StatusCode, &'static str, String) {
    tracing::error!("{}: {}", message, err);
    (StatusCode::INTERNAL_SERVER_ERROR, code, message.to_string())
}

fn loan_error_parts(err: &LoanApplicationError) -> (StatusCode, &'static str, String) {
    match err {
        // 404 Not Found - リクエストされたリソースが存在しない
        LoanApplicationError::BookNotFound => {
            (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", err.to_string())
        }
        LoanApplicationError::UserNotFound => {
            (StatusCode::NOT_FOUND, "USER_NOT_FOUND", err.to_string())
        }
        LoanApplicationError::LoanNotFound => {
            (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", err.to_string())
        }

        // 409 Conflict - 貸出中の書籍
        LoanApplicationError::IssueRejected(reason) => {
            let code = match reason {
                IssueBookError::AlreadyIssuedToRequester => "ALREADY_ISSUED_TO_YOU",
                IssueBookError::IssuedToAnotherUser => "ISSUED_TO_ANOTHER_USER",
            };
            (StatusCode::CONFLICT, code, format!("{reason}."))
        }

        // 返却のビジネスルール違反
        LoanApplicationError::ReturnRejected(reason) => {
            let (status, code) = match reason {
                ReturnBookError::NotIssued => (StatusCode::NOT_FOUND, "NOT_ISSUED"),
                ReturnBookError::NotOwner => (StatusCode::FORBIDDEN, "NOT_OWNER"),
                ReturnBookError::AlreadyReturned => (StatusCode::BAD_REQUEST, "ALREADY_RETURNED"),
            };
            (status, code, format!("{reason}."))
        }

        // 500 Internal Server Error - システム障害
        LoanApplicationError::LedgerStoreError(e) => {
            internal("LEDGER_STORE_ERROR", "Failed to update the loan ledger", e)
        }
        LoanApplicationError::BookCatalogError(e) => {
            internal("BOOK_CATALOG_ERROR", "Book catalog error", &**e)
        }
        LoanApplicationError::UserDirectoryError(e) => {
            internal("USER_DIRECTORY_ERROR", "User directory error", &**e)
        }
    }
}

fn catalog_error_parts(err: &CatalogError) -> (StatusCode, &'static str, String) {
    match err {
        CatalogError::BookNotFound => (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", err.to_string()),
        CatalogError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND", err.to_string()),
        CatalogError::DuplicateTitle => (StatusCode::CONFLICT, "DUPLICATE_TITLE", err.to_string()),
        CatalogError::BookCheckedOut => {
            (StatusCode::CONFLICT, "BOOK_CHECKED_OUT", err.to_string())
        }
        CatalogError::UserHasOpenLoans => {
            (StatusCode::CONFLICT, "USER_HAS_OPEN_LOANS", err.to_string())
        }
        CatalogError::BookCatalogError(e) => {
            internal("BOOK_CATALOG_ERROR", "Book catalog error", &**e)
        }
        CatalogError::UserDirectoryError(e) => {
            internal("USER_DIRECTORY_ERROR", "User directory error", &**e)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Loan(err) => loan_error_parts(err),
            ApiError::Catalog(err) => catalog_error_parts(err),
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
