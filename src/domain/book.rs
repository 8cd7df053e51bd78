use serde::{Deserialize, Serialize};

use super::{BookId, CopyAdjustment, CopyCountError};

// ============================================================================
// 在庫冊数（不変条件を型で強制）
// ============================================================================

/// 在庫冊数
///
/// 不変条件：`1 <= total` かつ `0 <= available <= total`
/// コンストラクタと遷移関数以外で値を作れないため、
/// 不正な冊数（負数、総数超過）を持つ書籍は存在しえない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyCounts {
    total: i32,
    available: i32,
}

impl CopyCounts {
    /// 冊数を検証して作成する
    ///
    /// # エラー
    /// - `NoCopies`: 総冊数が1未満
    /// - `NegativeAvailable`: 利用可能冊数が負数
    /// - `AvailableExceedsTotal`: 利用可能冊数が総冊数を超える
    pub fn new(total: i32, available: i32) -> Result<Self, CopyCountError> {
        if total < 1 {
            return Err(CopyCountError::NoCopies);
        }
        if available < 0 {
            return Err(CopyCountError::NegativeAvailable);
        }
        if available > total {
            return Err(CopyCountError::AvailableExceedsTotal);
        }
        Ok(Self { total, available })
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn available(&self) -> i32 {
        self.available
    }

    /// 1冊以上貸出可能か
    pub fn is_available(&self) -> bool {
        self.available > 0
    }

    /// 利用可能冊数を1減らす
    ///
    /// # エラー
    /// 利用可能冊数が0の場合は`CopyCountError::NoneAvailable`
    pub fn decrement(self) -> Result<Self, CopyCountError> {
        if self.available == 0 {
            return Err(CopyCountError::NoneAvailable);
        }
        Ok(Self {
            available: self.available - 1,
            ..self
        })
    }

    /// 利用可能冊数を1増やす
    ///
    /// # エラー
    /// 既に全冊が在庫にある場合は`CopyCountError::AllCopiesOnShelf`
    pub fn increment(self) -> Result<Self, CopyCountError> {
        if self.available >= self.total {
            return Err(CopyCountError::AllCopiesOnShelf);
        }
        Ok(Self {
            available: self.available + 1,
            ..self
        })
    }

    pub fn apply(self, adjustment: CopyAdjustment) -> Result<Self, CopyCountError> {
        match adjustment {
            CopyAdjustment::Decrement => self.decrement(),
            CopyAdjustment::Increment => self.increment(),
        }
    }
}

// ============================================================================
// 書籍
// ============================================================================

/// 書籍の書誌情報（冊数以外のフィールド）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// 書籍集約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub book_id: BookId,
    pub details: BookDetails,
    pub copies: CopyCounts,
}

impl Book {
    /// 派生値：貸出可能か
    pub fn is_available(&self) -> bool {
        self.copies.is_available()
    }
}

/// 未登録の書籍（IDはストアが採番する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub details: BookDetails,
    pub copies: CopyCounts,
}

impl NewBook {
    /// 採番されたIDで書籍を確定する
    pub fn with_id(self, book_id: BookId) -> Book {
        Book {
            book_id,
            details: self.details,
            copies: self.copies,
        }
    }
}

/// 純粋関数：在庫数を調整する
///
/// 副作用なし。調整後の書籍を返す。不変条件に反する場合は元の書籍は変更されない。
pub fn adjust_copies(book: &Book, adjustment: CopyAdjustment) -> Result<Book, CopyCountError> {
    let copies = book.copies.apply(adjustment)?;
    Ok(Book {
        copies,
        ..book.clone()
    })
}
