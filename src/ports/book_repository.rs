use crate::domain::{
    CopyAdjustment,
    book::{Book, NewBook},
    value_objects::BookId,
};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 在庫数調整の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyCountUpdate {
    /// 調整を適用した（調整後の書籍）
    Updated(Book),
    /// 書籍が存在しない
    BookNotFound,
    /// 不変条件に反するため適用しなかった（在庫は変更されていない）
    Rejected(Book),
}

/// 書籍登録の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Book),
    /// 同じISBNの書籍が既に存在する
    DuplicateIsbn,
}

/// 書籍更新の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Book),
    BookNotFound,
    /// 変更後のISBNが他の書籍と重複する
    DuplicateIsbn,
}

/// 書籍リポジトリポート
///
/// カタログコンテキストが書籍と在庫数を永続化するための抽象。
/// 在庫数の変更は`apply_copy_adjustment`のみを通し、
/// 同一書籍への同時調整でも不変条件（0 <= 利用可能冊数 <= 総冊数）を破らないことを実装に求める。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 新しい書籍を登録する（IDはストアが採番する）
    async fn insert(&self, book: NewBook) -> Result<InsertOutcome>;

    /// 書籍の全フィールドを置き換える
    async fn update(&self, book: Book) -> Result<UpdateOutcome>;

    /// 書籍を削除する。存在した場合は`true`
    async fn delete(&self, book_id: BookId) -> Result<bool>;

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    async fn find_all(&self) -> Result<Vec<Book>>;

    /// 著者名の部分一致（大文字小文字を区別しない）
    async fn search_by_author(&self, author: &str) -> Result<Vec<Book>>;

    /// タイトルの部分一致（大文字小文字を区別しない）
    async fn search_by_title(&self, title: &str) -> Result<Vec<Book>>;

    /// カテゴリの完全一致
    async fn find_by_category(&self, category: &str) -> Result<Vec<Book>>;

    /// 利用可能冊数が1以上の書籍
    async fn find_available(&self) -> Result<Vec<Book>>;

    /// 在庫数を原子的に調整する
    ///
    /// 「条件付き更新」または「書籍単位の直列化」のいずれかで実装し、
    /// 読み取りから書き込みまでの間に他の調整が割り込まないことを保証する。
    async fn apply_copy_adjustment(
        &self,
        book_id: BookId,
        adjustment: CopyAdjustment,
    ) -> Result<CopyCountUpdate>;
}
