use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_book, create_user, delete_book, delete_loan, delete_user, get_book,
    get_issued_book, get_user, health_check, issue_book, list_books, list_issued_books,
    list_users, return_book,
};

/// Creates the API router
///
/// Issue / return:
/// - POST /books/issue - Issue a book to a user
/// - POST /books/return - Return an issued book and settle the late fee
/// - GET /books/issue - List open loans
/// - GET /books/issue/:id - Open loan of a book
/// - DELETE /loans/:id - Delete a loan record
///
/// Catalog:
/// - GET, POST /books and GET, DELETE /books/:id
/// - GET, POST /users and GET, DELETE /users/:id
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Issue / return
        .route("/books/issue", get(list_issued_books).post(issue_book))
        .route("/books/issue/:id", get(get_issued_book))
        .route("/books/return", post(return_book))
        .route("/loans/:id", delete(delete_loan))
        // Catalog
        .route("/books", get(list_books).post(create_book))
        .route("/books/:id", get(get_book).delete(delete_book))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).delete(delete_user))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}
