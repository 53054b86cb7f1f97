use crate::application::{catalog, loan};
use crate::application::loan::ServiceDependencies;
use crate::domain::value_objects::{BookId, LoanId, UserId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BookIssuedResponse, BookLoanRequest, BookResponse, BookReturnedResponse,
        CreateBookRequest, CreateUserRequest, HealthResponse, IssuedBookEnvelope,
        IssuedBooksResponse, UserResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

// ============================================================================
// Issue / return
// ============================================================================

/// POST /books/issue - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 書籍と利用者が存在すること
/// - 書籍に未返却の貸出がないこと（本人・他の利用者どちらの貸出でも 409）
pub async fn issue_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookLoanRequest>,
) -> Result<(StatusCode, Json<BookIssuedResponse>), ApiError> {
    let cmd = req.to_issue_command(Utc::now());

    let issued = loan::issue_book(&state.service_deps, cmd).await?;

    let response = BookIssuedResponse {
        message: "Book issued successfully".to_string(),
        issued_book: issued.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /books/return - 書籍を返却する
///
/// 延滞料金は返却時点で確定し、レスポンスに含まれる。
///
/// 強制されるビジネスルール:
/// - 書籍が貸出中であること（404）
/// - 貸出を受けた本人であること（403）
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookLoanRequest>,
) -> Result<Json<BookReturnedResponse>, ApiError> {
    let cmd = req.to_return_command(Utc::now());

    let returned = loan::return_book(&state.service_deps, cmd).await?;

    Ok(Json(returned.into()))
}

/// GET /books/issue - 未返却の貸出一覧
pub async fn list_issued_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IssuedBooksResponse>, ApiError> {
    let loans = loan::list_issued_books(&state.service_deps).await?;

    Ok(Json(IssuedBooksResponse {
        issued_books: loans.into_iter().map(Into::into).collect(),
    }))
}

/// GET /books/issue/:id - 書籍の未返却の貸出
pub async fn get_issued_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<IssuedBookEnvelope>, ApiError> {
    let issued = loan::get_issued_book(&state.service_deps, BookId::from_uuid(book_id)).await?;

    Ok(Json(IssuedBookEnvelope {
        issued_book: issued.into(),
    }))
}

/// DELETE /loans/:id - 貸出記録の削除（管理用）
pub async fn delete_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    loan::delete_loan_record(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Books
// ============================================================================

pub async fn list_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = catalog::list_books(&state.service_deps).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// POST /books - 書籍を登録（タイトル重複は 409）
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let book = catalog::register_book(&state.service_deps, req.into()).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}

/// DELETE /books/:id - 書籍を削除（貸出中は 409）
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::remove_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Users
// ============================================================================

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = catalog::list_users(&state.service_deps).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = catalog::register_user(&state.service_deps, req.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = catalog::get_user(&state.service_deps, UserId::from_uuid(user_id)).await?;
    Ok(Json(user.into()))
}

/// DELETE /users/:id - 利用者を削除（未返却の貸出があれば 409）
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::remove_user(&state.service_deps, UserId::from_uuid(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
