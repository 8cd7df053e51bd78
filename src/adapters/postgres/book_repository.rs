use crate::domain::{
    CopyAdjustment,
    book::{Book, BookDetails, CopyCounts, NewBook},
    value_objects::BookId,
};
use crate::ports::book_repository::{
    BookRepository as BookRepositoryTrait, CopyCountUpdate, InsertOutcome, Result, UpdateOutcome,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

const BOOK_COLUMNS: &str = "id, isbn, title, author, publisher, publication_year, category, \
                            total_copies, available_copies, description";

/// PostgreSQLの行データをBookに変換する
///
/// 冊数はCHECK制約で守られているが、読み取り時にも不変条件を検証する。
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let total: i32 = row.get("total_copies");
    let available: i32 = row.get("available_copies");
    let copies = CopyCounts::new(total, available).map_err(|e| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("stored copy counts {}/{} are invalid: {}", available, total, e),
        )) as Box<dyn std::error::Error + Send + Sync>
    })?;

    Ok(Book {
        book_id: BookId::from_uuid(row.get("id")),
        details: BookDetails {
            isbn: row.get("isbn"),
            title: row.get("title"),
            author: row.get("author"),
            publisher: row.get("publisher"),
            publication_year: row.get("publication_year"),
            category: row.get("category"),
            description: row.get("description"),
        },
        copies,
    })
}

/// 部分一致検索用のLIKEパターン
///
/// 入力中の`\`、`%`、`_`はエスケープし、ワイルドカードではなく文字として一致させる。
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// BookRepositoryのPostgreSQL実装
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, condition: &str, arg: Option<&str>) -> Result<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE {} ORDER BY title ASC",
            BOOK_COLUMNS, condition
        );
        let query = sqlx::query(&sql);
        let query = match arg {
            Some(arg) => query.bind(arg),
            None => query,
        };
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_book).collect()
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    /// 書籍を登録する
    ///
    /// IDはgen_random_uuid()で採番する。ISBNのUNIQUE制約違反は`DuplicateIsbn`として返す。
    async fn insert(&self, book: NewBook) -> Result<InsertOutcome> {
        let sql = format!(
            r#"
            INSERT INTO books (
                isbn, title, author, publisher, publication_year,
                category, total_copies, available_copies, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(&book.details.isbn)
            .bind(&book.details.title)
            .bind(&book.details.author)
            .bind(&book.details.publisher)
            .bind(book.details.publication_year)
            .bind(&book.details.category)
            .bind(book.copies.total())
            .bind(book.copies.available())
            .bind(&book.details.description)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Inserted(map_row_to_book(&row)?)),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::DuplicateIsbn),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, book: Book) -> Result<UpdateOutcome> {
        let sql = format!(
            r#"
            UPDATE books SET
                isbn = $2,
                title = $3,
                author = $4,
                publisher = $5,
                publication_year = $6,
                category = $7,
                total_copies = $8,
                available_copies = $9,
                description = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(book.book_id.value())
            .bind(&book.details.isbn)
            .bind(&book.details.title)
            .bind(&book.details.author)
            .bind(&book.details.publisher)
            .bind(book.details.publication_year)
            .bind(&book.details.category)
            .bind(book.copies.total())
            .bind(book.copies.available())
            .bind(&book.details.description)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => Ok(UpdateOutcome::Updated(map_row_to_book(&row)?)),
            Ok(None) => Ok(UpdateOutcome::BookNotFound),
            Err(e) if is_unique_violation(&e) => Ok(UpdateOutcome::DuplicateIsbn),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        self.fetch_where("TRUE", None).await
    }

    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>> {
        self.fetch_where("author ILIKE $1 ESCAPE '\\'", Some(&contains_pattern(author)))
            .await
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>> {
        self.fetch_where("title ILIKE $1 ESCAPE '\\'", Some(&contains_pattern(title)))
            .await
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Book>> {
        self.fetch_where("category = $1", Some(category)).await
    }

    async fn find_available(&self) -> Result<Vec<Book>> {
        self.fetch_where("available_copies > 0", None).await
    }

    /// 在庫数を条件付きUPDATEで原子的に調整する
    ///
    /// 条件（減算は在庫 > 0、加算は在庫 < 総冊数）をWHERE句に含めるため、
    /// 同時に実行されても不変条件を破る更新は0行となる。
    /// 0行の場合は書籍の有無を確認し、BookNotFoundかRejectedを返す。
    async fn apply_copy_adjustment(
        &self,
        book_id: BookId,
        adjustment: CopyAdjustment,
    ) -> Result<CopyCountUpdate> {
        let (delta, guard) = match adjustment {
            CopyAdjustment::Decrement => (-1, "available_copies > 0"),
            CopyAdjustment::Increment => (1, "available_copies < total_copies"),
        };
        let sql = format!(
            r#"
            UPDATE books
            SET available_copies = available_copies + $2, updated_at = NOW()
            WHERE id = $1 AND {}
            RETURNING {}
            "#,
            guard, BOOK_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(book_id.value())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(CopyCountUpdate::Updated(map_row_to_book(&row)?));
        }

        match self.get_by_id(book_id).await? {
            Some(book) => Ok(CopyCountUpdate::Rejected(book)),
            None => Ok(CopyCountUpdate::BookNotFound),
        }
    }
}
