use crate::domain::value_objects::{BookId, CopyAdjustment};
use async_trait::async_trait;

/// カタログ呼び出しが失敗した理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleFailure {
    /// カタログは応答したが成功以外のステータスを返した（「いいえ」と答えた）
    Rejected { status: u16, message: String },
    /// カタログに到達できなかった（接続失敗、タイムアウト、応答の解釈失敗）
    Unreachable(String),
}

impl std::fmt::Display for OracleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleFailure::Rejected { status, message } => {
                write!(f, "catalog rejected request ({}): {}", status, message)
            }
            OracleFailure::Unreachable(reason) => write!(f, "catalog unreachable: {}", reason),
        }
    }
}

/// 貸出可否の問い合わせ結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityCheck {
    Available,
    NotAvailable,
    /// 問い合わせ自体が失敗した。呼び出し側は「貸出不可」として扱う
    Degraded(OracleFailure),
}

impl AvailabilityCheck {
    /// 貸出可能と確認できた場合のみ`true`
    pub fn is_available(&self) -> bool {
        matches!(self, AvailabilityCheck::Available)
    }
}

/// 在庫調整依頼の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustmentOutcome {
    Applied,
    /// 依頼が反映されなかった。呼び出し側は記録して処理を続行する
    Degraded(OracleFailure),
}

/// 貸出可否オラクルポート
///
/// 貸出コンテキストがカタログコンテキストの在庫を参照・調整するための狭い境界。
/// 本番ではカタログサービスのHTTP API、テストではスタブが実装する。
///
/// 失敗はエラーとして返さず、結果型の`Degraded`として表現する。
/// 読み取りの失敗は「貸出不可」、書き込みの失敗は「記録して続行」として扱われる。
#[async_trait]
pub trait AvailabilityOracle: Send + Sync {
    async fn check_availability(&self, book_id: BookId) -> AvailabilityCheck;

    async fn decrement(&self, book_id: BookId) -> AdjustmentOutcome;

    async fn increment(&self, book_id: BookId) -> AdjustmentOutcome;

    async fn adjust(&self, book_id: BookId, adjustment: CopyAdjustment) -> AdjustmentOutcome {
        match adjustment {
            CopyAdjustment::Decrement => self.decrement(book_id).await,
            CopyAdjustment::Increment => self.increment(book_id).await,
        }
    }
}
