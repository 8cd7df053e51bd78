use crate::domain::{
    CopyAdjustment,
    book::{self, Book, NewBook},
    value_objects::BookId,
};
use crate::ports::book_repository::{
    BookRepository as BookRepositoryTrait, CopyCountUpdate, InsertOutcome, Result, UpdateOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// BookRepositoryのインメモリ実装
///
/// 全操作を1つのMutexで直列化するため、同一書籍への同時調整でも
/// 読み取りから書き込みまでの間に他の調整が割り込まない。
pub struct BookRepository {
    books: Mutex<HashMap<BookId, Book>>,
}

impl BookRepository {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(HashMap::new()),
        }
    }

    fn books(&self) -> Result<MutexGuard<'_, HashMap<BookId, Book>>> {
        Ok(self.books.lock().map_err(|_| "book store lock poisoned")?)
    }

    fn select(&self, predicate: impl Fn(&Book) -> bool) -> Result<Vec<Book>> {
        let mut books: Vec<Book> = self
            .books()?
            .values()
            .filter(|b| predicate(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.details.title.cmp(&b.details.title));
        Ok(books)
    }
}

impl Default for BookRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn insert(&self, new_book: NewBook) -> Result<InsertOutcome> {
        let mut books = self.books()?;
        if books.values().any(|b| b.details.isbn == new_book.details.isbn) {
            return Ok(InsertOutcome::DuplicateIsbn);
        }

        let book = new_book.with_id(BookId::new());
        books.insert(book.book_id, book.clone());
        Ok(InsertOutcome::Inserted(book))
    }

    async fn update(&self, book: Book) -> Result<UpdateOutcome> {
        let mut books = self.books()?;
        if !books.contains_key(&book.book_id) {
            return Ok(UpdateOutcome::BookNotFound);
        }
        if books
            .values()
            .any(|b| b.book_id != book.book_id && b.details.isbn == book.details.isbn)
        {
            return Ok(UpdateOutcome::DuplicateIsbn);
        }

        books.insert(book.book_id, book.clone());
        Ok(UpdateOutcome::Updated(book))
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        Ok(self.books()?.remove(&book_id).is_some())
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.books()?.get(&book_id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        Ok(self
            .books()?
            .values()
            .find(|b| b.details.isbn == isbn)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        self.select(|_| true)
    }

    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>> {
        self.select(|b| contains_ignore_case(&b.details.author, author))
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>> {
        self.select(|b| contains_ignore_case(&b.details.title, title))
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Book>> {
        self.select(|b| b.details.category.as_deref() == Some(category))
    }

    async fn find_available(&self) -> Result<Vec<Book>> {
        self.select(Book::is_available)
    }

    async fn apply_copy_adjustment(
        &self,
        book_id: BookId,
        adjustment: CopyAdjustment,
    ) -> Result<CopyCountUpdate> {
        let mut books = self.books()?;
        let Some(current) = books.get(&book_id) else {
            return Ok(CopyCountUpdate::BookNotFound);
        };

        match book::adjust_copies(current, adjustment) {
            Ok(adjusted) => {
                books.insert(book_id, adjusted.clone());
                Ok(CopyCountUpdate::Updated(adjusted))
            }
            Err(_) => Ok(CopyCountUpdate::Rejected(current.clone())),
        }
    }
}
