pub mod book_catalog;
pub mod ledger_store;
pub mod user_directory;

// パブリックに型を再エクスポート
pub use book_catalog::BookCatalog as PostgresBookCatalog;
pub use ledger_store::LedgerStore as PostgresLedgerStore;
pub use user_directory::UserDirectory as PostgresUserDirectory;
