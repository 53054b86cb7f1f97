mod errors;
mod loan_service;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    ServiceDependencies, delete_loan_record, get_issued_book, issue_book, list_issued_books,
    return_book,
};
