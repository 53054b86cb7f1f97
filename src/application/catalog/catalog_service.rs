use crate::application::loan::ServiceDependencies;
use crate::domain::{
    book::{Book, NewBook},
    commands::{RegisterBook, RegisterUser},
    user::User,
    value_objects::{BookId, UserId},
};
use crate::ports::DeleteOutcome;
use chrono::Utc;

use super::errors::{CatalogError, Result};

/// 書籍を登録する
///
/// 同じタイトルの書籍が既にあれば DuplicateTitle。
/// 著者と配架場所はカタログ側で名前から引くか作成する。
pub async fn register_book(deps: &ServiceDependencies, cmd: RegisterBook) -> Result<Book> {
    // 1. タイトル重複の確認
    let existing = deps
        .book_catalog
        .find_book_by_title(&cmd.title)
        .await
        .map_err(CatalogError::BookCatalogError)?;

    if existing.is_some() {
        tracing::warn!(title = %cmd.title, "duplicate book title");
        return Err(CatalogError::DuplicateTitle);
    }

    // 2. 登録（貸出中フラグは false で始まる）
    let book = deps
        .book_catalog
        .create_book(NewBook {
            book_id: BookId::new(),
            title: cmd.title,
            author_name: cmd.author_name,
            location_name: cmd.location_name,
            book_type: cmd.book_type,
            created_at: Utc::now(),
        })
        .await
        .map_err(CatalogError::BookCatalogError)?;

    tracing::info!(book_id = %book.book_id, title = %book.title, "book registered");

    Ok(book)
}

pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    deps.book_catalog
        .list_books()
        .await
        .map_err(CatalogError::BookCatalogError)
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.book_catalog
        .get_book(book_id)
        .await
        .map_err(CatalogError::BookCatalogError)?
        .ok_or(CatalogError::BookNotFound)
}

/// 書籍を削除する
///
/// 貸出中の書籍は削除できない。貸出中かどうかの確認と削除はカタログの
/// 1つの作業単位で行う。
/// 返却済みの貸出記録は書籍と一緒に消える。
pub async fn remove_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    let outcome = deps
        .book_catalog
        .delete_book(book_id)
        .await
        .map_err(CatalogError::BookCatalogError)?;

    match outcome {
        DeleteOutcome::Deleted => {
            tracing::info!(book_id = %book_id, "book removed");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(CatalogError::BookNotFound),
        DeleteOutcome::HasOpenLoan => {
            tracing::warn!(book_id = %book_id, "refused to remove an issued book");
            Err(CatalogError::BookCheckedOut)
        }
    }
}

/// 利用者を登録する
pub async fn register_user(deps: &ServiceDependencies, cmd: RegisterUser) -> Result<User> {
    let user = User {
        user_id: UserId::new(),
        name: cmd.name,
        standard: cmd.standard,
    };

    deps.user_directory
        .create_user(&user)
        .await
        .map_err(CatalogError::UserDirectoryError)?;

    tracing::info!(user_id = %user.user_id, "user registered");

    Ok(user)
}

pub async fn list_users(deps: &ServiceDependencies) -> Result<Vec<User>> {
    deps.user_directory
        .list_users()
        .await
        .map_err(CatalogError::UserDirectoryError)
}

pub async fn get_user(deps: &ServiceDependencies, user_id: UserId) -> Result<User> {
    deps.user_directory
        .get_user(user_id)
        .await
        .map_err(CatalogError::UserDirectoryError)?
        .ok_or(CatalogError::UserNotFound)
}

/// 利用者を削除する
///
/// 未返却の貸出がある利用者は削除できない。確認と削除は同じ作業単位で行う。
pub async fn remove_user(deps: &ServiceDependencies, user_id: UserId) -> Result<()> {
    let outcome = deps
        .user_directory
        .delete_user(user_id)
        .await
        .map_err(CatalogError::UserDirectoryError)?;

    match outcome {
        DeleteOutcome::Deleted => {
            tracing::info!(user_id = %user_id, "user removed");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(CatalogError::UserNotFound),
        DeleteOutcome::HasOpenLoan => {
            tracing::warn!(user_id = %user_id, "refused to remove a user holding books");
            Err(CatalogError::UserHasOpenLoans)
        }
    }
}
