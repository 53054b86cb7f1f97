mod catalog_service;
mod errors;

pub use catalog_service::{
    get_book, get_user, list_books, list_users, register_book, register_user, remove_book,
    remove_user,
};
pub use errors::{CatalogError, Result};
