mod catalog_service;
mod errors;

pub use catalog_service::{
    BookInput, CatalogDependencies, check_availability, create_book, decrement_available_copies,
    delete_book, get_book, get_book_by_isbn, increment_available_copies, list_available,
    list_books, list_by_category, search_by_author, search_by_title, update_book,
};
pub use errors::{CatalogApplicationError, Result};
