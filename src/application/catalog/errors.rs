use crate::domain::{CopyCountError, value_objects::BookId};
use thiserror::Error;

/// カタログ管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CatalogApplicationError {
    /// 書籍が見つからない
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// ISBNが既に登録されている
    #[error("A book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    /// 在庫数の調整が不変条件に反する（在庫0での貸出、全冊在庫での返却）
    #[error("Copy count conflict for book {book_id}: {reason}")]
    CopyCountConflict {
        book_id: BookId,
        reason: CopyCountError,
    },

    /// 入力された冊数が不変条件に反する
    #[error("Invalid copy counts: {0}")]
    InvalidCopyCounts(CopyCountError),

    /// BookRepositoryのエラー
    #[error("Book repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CatalogApplicationError {
    pub(super) fn not_found(book_id: BookId) -> Self {
        CatalogApplicationError::BookNotFound(format!("id {}", book_id))
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CatalogApplicationError>;
