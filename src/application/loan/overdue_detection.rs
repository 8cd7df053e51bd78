use crate::domain::loan::Loan;
use chrono::NaiveDate;

use super::errors::{LoanApplicationError, Result};
use super::loan_service::ServiceDependencies;

/// 延滞更新バッチ
///
/// 定期的に実行され、返却期限を過ぎたActiveな貸出をOverdueへ遷移させる。
///
/// ビジネスルール：
/// - status が Active、due_date < today、未返却の貸出のみ対象
/// - 既にOverdueの貸出は対象外のため、続けて実行しても2回目は0件になる
/// - カタログとのやり取りはない
///
/// 判定と更新はリポジトリが1回の書き込みで行う。同時に返却・取消された貸出は遷移しない。
///
/// # 戻り値
/// 今回Overdueへ遷移した貸出
pub async fn update_overdue_loans(
    deps: &ServiceDependencies,
    today: NaiveDate,
) -> Result<Vec<Loan>> {
    let transitioned = deps
        .loan_repository
        .mark_overdue(today)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    tracing::info!(count = transitioned.len(), today = %today, "Overdue sweep finished");

    Ok(transitioned)
}
