use super::InMemoryLibrary;
use crate::domain::{
    book::{Book, NewBook},
    value_objects::{AuthorId, BookId, LocationId},
};
use crate::ports::book_catalog::{BookCatalog, DeleteOutcome, Result};
use async_trait::async_trait;

#[async_trait]
impl BookCatalog for InMemoryLibrary {
    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.read().await.books.get(&book_id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let mut books: Vec<Book> = self.read().await.books.values().cloned().collect();
        books.sort_by_key(|book| book.created_at);
        Ok(books)
    }

    async fn find_book_by_title(&self, title: &str) -> Result<Option<Book>> {
        Ok(self
            .read()
            .await
            .books
            .values()
            .find(|book| book.title == title)
            .cloned())
    }

    /// Authors and locations are resolved by name, created on first use.
    async fn create_book(&self, new_book: NewBook) -> Result<Book> {
        let mut uow = self.begin().await;
        let state = uow.state();

        let author_id = *state
            .authors
            .entry(new_book.author_name)
            .or_insert_with(AuthorId::new);
        let location_id = *state
            .locations
            .entry(new_book.location_name)
            .or_insert_with(LocationId::new);

        let book = Book {
            book_id: new_book.book_id,
            title: new_book.title,
            author_id,
            location_id,
            is_checked_out: false,
            book_type: new_book.book_type,
            created_at: new_book.created_at,
        };
        state.books.insert(book.book_id, book.clone());

        uow.commit();
        Ok(book)
    }

    async fn delete_book(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut uow = self.begin().await;
        let state = uow.state();

        if !state.books.contains_key(&book_id) {
            return Ok(DeleteOutcome::NotFound);
        }
        if state.open_loan(book_id).is_some() {
            return Ok(DeleteOutcome::HasOpenLoan);
        }

        state.books.remove(&book_id);
        state.loans.retain(|loan| loan.book_id != book_id);
        uow.commit();
        Ok(DeleteOutcome::Deleted)
    }
}
