use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::api::types::FieldErrors;
use crate::application::catalog::BookInput;
use crate::domain::book::{Book, BookDetails};

/// 出版年として受け付ける最小値
const MIN_PUBLICATION_YEAR: i32 = 1000;

/// 書籍の登録・更新リクエスト（POST /books, PUT /books/:id）
///
/// 欠けたフィールドを検証エラーとして報告できるよう、すべてOptionで受ける。
#[derive(Debug, Default, Deserialize)]
pub struct BookRequest {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub total_copies: Option<i32>,
    /// 省略時は`total_copies`と同じ（全冊在庫）
    pub available_copies: Option<i32>,
    pub description: Option<String>,
}

impl BookRequest {
    /// 入力を検証してアプリケーション層の入力に変換する
    pub fn validate(self) -> Result<BookInput, BTreeMap<String, String>> {
        let mut errors = FieldErrors::default();

        let isbn = errors.require_text("isbn", self.isbn);
        let title = errors.require_text("title", self.title);
        let author = errors.require_text("author", self.author);

        if let Some(year) = self.publication_year {
            if year < MIN_PUBLICATION_YEAR {
                errors.add(
                    "publication_year",
                    format!("publication_year must be at least {}", MIN_PUBLICATION_YEAR),
                );
            }
        }

        let total_copies = match self.total_copies {
            Some(total) if total >= 1 => total,
            Some(_) => {
                errors.add("total_copies", "total_copies must be at least 1");
                0
            }
            None => {
                errors.add("total_copies", "total_copies is required");
                0
            }
        };

        let available_copies = self.available_copies.unwrap_or(total_copies);
        if available_copies < 0 {
            errors.add("available_copies", "available_copies cannot be negative");
        } else if total_copies >= 1 && available_copies > total_copies {
            errors.add(
                "available_copies",
                "available_copies cannot exceed total_copies",
            );
        }

        errors.into_result()?;

        Ok(BookInput {
            details: BookDetails {
                isbn: isbn.trim().to_string(),
                title,
                author,
                publisher: self.publisher,
                publication_year: self.publication_year,
                category: self.category,
                description: self.description,
            },
            total_copies,
            available_copies,
        })
    }
}

/// 書籍レスポンス
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub description: Option<String>,
    pub is_available: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        let is_available = book.is_available();
        Self {
            id: book.book_id.value(),
            isbn: book.details.isbn,
            title: book.details.title,
            author: book.details.author,
            publisher: book.details.publisher,
            publication_year: book.details.publication_year,
            category: book.details.category,
            total_copies: book.copies.total(),
            available_copies: book.copies.available(),
            description: book.details.description,
            is_available,
        }
    }
}

/// 著者名・タイトル検索のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}
