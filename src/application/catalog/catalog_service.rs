use crate::domain::{
    CopyAdjustment, CopyCountError,
    book::{Book, BookDetails, CopyCounts, NewBook},
    value_objects::BookId,
};
use crate::ports::{BookRepository, CopyCountUpdate, InsertOutcome, UpdateOutcome};
use std::sync::Arc;

use super::errors::{CatalogApplicationError, Result};

/// カタログサービスの依存関係
///
/// 貸出サービスと同じく、振る舞いを持たないデータ構造として定義し、
/// 各ユースケース関数に明示的に渡す。
#[derive(Clone)]
pub struct CatalogDependencies {
    pub book_repository: Arc<dyn BookRepository>,
}

/// 書籍の登録・更新に使う入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub details: BookDetails,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl BookInput {
    fn into_new_book(self) -> Result<NewBook> {
        let copies = CopyCounts::new(self.total_copies, self.available_copies)
            .map_err(CatalogApplicationError::InvalidCopyCounts)?;
        Ok(NewBook {
            details: self.details,
            copies,
        })
    }
}

// ============================================================================
// クエリ
// ============================================================================

pub async fn list_books(deps: &CatalogDependencies) -> Result<Vec<Book>> {
    deps.book_repository
        .find_all()
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

pub async fn get_book(deps: &CatalogDependencies, book_id: BookId) -> Result<Book> {
    deps.book_repository
        .get_by_id(book_id)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?
        .ok_or_else(|| CatalogApplicationError::not_found(book_id))
}

pub async fn get_book_by_isbn(deps: &CatalogDependencies, isbn: &str) -> Result<Book> {
    deps.book_repository
        .find_by_isbn(isbn)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?
        .ok_or_else(|| CatalogApplicationError::BookNotFound(format!("isbn {}", isbn)))
}

pub async fn search_by_author(deps: &CatalogDependencies, author: &str) -> Result<Vec<Book>> {
    deps.book_repository
        .search_by_author(author)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

pub async fn search_by_title(deps: &CatalogDependencies, title: &str) -> Result<Vec<Book>> {
    deps.book_repository
        .search_by_title(title)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

pub async fn list_by_category(deps: &CatalogDependencies, category: &str) -> Result<Vec<Book>> {
    deps.book_repository
        .find_by_category(category)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

pub async fn list_available(deps: &CatalogDependencies) -> Result<Vec<Book>> {
    deps.book_repository
        .find_available()
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

/// 書籍が貸出可能か（利用可能冊数 > 0）
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
pub async fn check_availability(deps: &CatalogDependencies, book_id: BookId) -> Result<bool> {
    let book = get_book(deps, book_id).await?;
    Ok(book.is_available())
}

// ============================================================================
// コマンド
// ============================================================================

/// 書籍を登録する
///
/// ビジネスルール：
/// - ISBNは一意
/// - 冊数は 1 <= 総冊数、0 <= 利用可能冊数 <= 総冊数
pub async fn create_book(deps: &CatalogDependencies, input: BookInput) -> Result<Book> {
    let new_book = input.into_new_book()?;
    let isbn = new_book.details.isbn.clone();

    tracing::info!(isbn = %isbn, title = %new_book.details.title, "Creating book");

    match deps
        .book_repository
        .insert(new_book)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?
    {
        InsertOutcome::Inserted(book) => {
            tracing::info!(book_id = %book.book_id, "Book created");
            Ok(book)
        }
        InsertOutcome::DuplicateIsbn => {
            tracing::warn!(isbn = %isbn, "Rejected book with duplicate ISBN");
            Err(CatalogApplicationError::DuplicateIsbn(isbn))
        }
    }
}

/// 書籍の全フィールドを置き換える
///
/// 冊数も入力で置き換えるため、貸出中の冊数との整合は呼び出し側の責任となる。
pub async fn update_book(
    deps: &CatalogDependencies,
    book_id: BookId,
    input: BookInput,
) -> Result<Book> {
    let isbn = input.details.isbn.clone();
    let book = input.into_new_book()?.with_id(book_id);

    match deps
        .book_repository
        .update(book)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?
    {
        UpdateOutcome::Updated(book) => {
            tracing::info!(book_id = %book_id, "Book updated");
            Ok(book)
        }
        UpdateOutcome::BookNotFound => Err(CatalogApplicationError::not_found(book_id)),
        UpdateOutcome::DuplicateIsbn => Err(CatalogApplicationError::DuplicateIsbn(isbn)),
    }
}

/// 書籍を削除する
///
/// 貸出中の貸出が参照していても削除は拒否しない（貸出コンテキストの記録は残る）。
pub async fn delete_book(deps: &CatalogDependencies, book_id: BookId) -> Result<()> {
    let deleted = deps
        .book_repository
        .delete(book_id)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?;

    if !deleted {
        return Err(CatalogApplicationError::not_found(book_id));
    }

    tracing::info!(book_id = %book_id, "Book deleted");
    Ok(())
}

/// 利用可能冊数を1減らす（貸出時）
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
/// - CopyCountConflict: 利用可能冊数が0
pub async fn decrement_available_copies(
    deps: &CatalogDependencies,
    book_id: BookId,
) -> Result<Book> {
    adjust_available_copies(deps, book_id, CopyAdjustment::Decrement).await
}

/// 利用可能冊数を1増やす（返却・取消時）
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
/// - CopyCountConflict: 利用可能冊数が総冊数に達している
pub async fn increment_available_copies(
    deps: &CatalogDependencies,
    book_id: BookId,
) -> Result<Book> {
    adjust_available_copies(deps, book_id, CopyAdjustment::Increment).await
}

async fn adjust_available_copies(
    deps: &CatalogDependencies,
    book_id: BookId,
    adjustment: CopyAdjustment,
) -> Result<Book> {
    let update = deps
        .book_repository
        .apply_copy_adjustment(book_id, adjustment)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?;

    match update {
        CopyCountUpdate::Updated(book) => {
            tracing::info!(
                book_id = %book_id,
                adjustment = %adjustment,
                available_copies = book.copies.available(),
                "Available copies adjusted"
            );
            Ok(book)
        }
        CopyCountUpdate::BookNotFound => Err(CatalogApplicationError::not_found(book_id)),
        CopyCountUpdate::Rejected(book) => {
            let reason = match adjustment {
                CopyAdjustment::Decrement => CopyCountError::NoneAvailable,
                CopyAdjustment::Increment => CopyCountError::AllCopiesOnShelf,
            };
            tracing::warn!(
                book_id = %book_id,
                adjustment = %adjustment,
                available_copies = book.copies.available(),
                total_copies = book.copies.total(),
                "Copy adjustment rejected"
            );
            Err(CatalogApplicationError::CopyCountConflict { book_id, reason })
        }
    }
}
