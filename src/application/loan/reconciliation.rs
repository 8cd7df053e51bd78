use crate::domain::{loan::Loan, value_objects::LoanId};
use serde::Serialize;

use super::errors::{LoanApplicationError, Result};
use super::loan_service::{ServiceDependencies, Settlement, request_adjustment};

/// 突き合わせの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// 対象とした貸出の件数
    pub examined: usize,
    /// カタログへの反映を確認できた件数
    pub cleared: usize,
    /// 依然として未反映の貸出
    pub still_pending: Vec<LoanId>,
}

/// カタログへ未反映の在庫調整を持つ貸出
pub async fn list_pending_reconciliation(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_pending_reconciliation()
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 未反映の在庫調整をカタログへ1回ずつ再依頼する
///
/// 反映を確認できた貸出はマーカーを消す。失敗した貸出はそのまま残し、次回の実行で再び対象になる。
/// 依頼中に返却などでマーカーが書き換えられた貸出は、どちらにも数えない。
pub async fn reconcile_pending_adjustments(
    deps: &ServiceDependencies,
) -> Result<ReconciliationReport> {
    let pending = list_pending_reconciliation(deps).await?;
    let examined = pending.len();
    let mut cleared = 0;
    let mut still_pending = Vec::new();

    for loan in pending {
        let Some(marker) = loan.pending_adjustment else {
            continue;
        };
        let loan_id = loan.loan_id;

        match request_adjustment(deps, loan, marker, false).await.1 {
            Settlement::Cleared => cleared += 1,
            Settlement::Pending => still_pending.push(loan_id),
            Settlement::Superseded => {}
        }
    }

    let report = ReconciliationReport {
        examined,
        cleared,
        still_pending,
    };

    tracing::info!(
        examined = report.examined,
        cleared = report.cleared,
        still_pending = report.still_pending.len(),
        "Reconciliation finished"
    );

    Ok(report)
}
