use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 貸出ID - 貸出管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LoanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 書籍ID - カタログ管理コンテキストの集約ID
///
/// 貸出コンテキストからは参照としてのみ使われる（所有しない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 在庫数の調整方向
///
/// 貸出コンテキストがカタログコンテキストへ依頼できる唯一の書き込み操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyAdjustment {
    /// 貸出時：利用可能冊数を1減らす
    Decrement,
    /// 返却・取消時：利用可能冊数を1増やす
    Increment,
}

impl CopyAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyAdjustment::Decrement => "DECREMENT",
            CopyAdjustment::Increment => "INCREMENT",
        }
    }
}

impl std::fmt::Display for CopyAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CopyAdjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DECREMENT" => Ok(CopyAdjustment::Decrement),
            "INCREMENT" => Ok(CopyAdjustment::Increment),
            _ => Err(format!("Invalid copy adjustment: {}", s)),
        }
    }
}

/// カタログへ未反映の在庫調整（貸出に記録するマーカー）
///
/// 減算の依頼結果が分からない場合（タイムアウトなど）と、カタログが明示的に拒否した場合を区別する。
/// 前者はカタログ側で適用済みの可能性があるため、返却時に相殺できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingAdjustment {
    /// 減算を依頼したが適用を確認できていない（適用済みの可能性がある）
    Decrement,
    /// 減算はすべて拒否された（カタログの在庫は変わっていない）
    DecrementRejected,
    /// 加算を依頼したが適用を確認できていない
    Increment,
}

impl PendingAdjustment {
    /// カタログへ（再）依頼すべき調整
    pub fn adjustment(&self) -> CopyAdjustment {
        match self {
            PendingAdjustment::Decrement | PendingAdjustment::DecrementRejected => {
                CopyAdjustment::Decrement
            }
            PendingAdjustment::Increment => CopyAdjustment::Increment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingAdjustment::Decrement => "DECREMENT",
            PendingAdjustment::DecrementRejected => "DECREMENT_REJECTED",
            PendingAdjustment::Increment => "INCREMENT",
        }
    }
}

impl std::fmt::Display for PendingAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PendingAdjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DECREMENT" => Ok(PendingAdjustment::Decrement),
            "DECREMENT_REJECTED" => Ok(PendingAdjustment::DecrementRejected),
            "INCREMENT" => Ok(PendingAdjustment::Increment),
            _ => Err(format!("Invalid pending adjustment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_id_creation() {
        let id1 = LoanId::new();
        let id2 = LoanId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_book_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = BookId::from_uuid(uuid);
        assert_eq!(id.value(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_copy_adjustment_parse() {
        assert_eq!(
            "DECREMENT".parse::<CopyAdjustment>(),
            Ok(CopyAdjustment::Decrement)
        );
        assert_eq!(
            CopyAdjustment::Increment.as_str().parse::<CopyAdjustment>(),
            Ok(CopyAdjustment::Increment)
        );
        assert!("decrement".parse::<CopyAdjustment>().is_err());
    }

    #[test]
    fn test_pending_adjustment_requests() {
        assert_eq!(
            PendingAdjustment::DecrementRejected.adjustment(),
            CopyAdjustment::Decrement
        );
        assert_eq!(
            PendingAdjustment::Increment.adjustment(),
            CopyAdjustment::Increment
        );
        assert_eq!(
            "DECREMENT_REJECTED".parse::<PendingAdjustment>(),
            Ok(PendingAdjustment::DecrementRejected)
        );
        assert!("CANCELLED".parse::<PendingAdjustment>().is_err());
    }
}
