pub mod book_catalog;
pub mod ledger_store;
pub mod user_directory;

pub use book_catalog::{BookCatalog, DeleteOutcome};
pub use ledger_store::{LedgerError, LedgerStore};
pub use user_directory::UserDirectory;
