use crate::application::loan::{self, ReconciliationReport, ServiceDependencies};
use crate::domain::{
    LoanStatus,
    commands::{CancelLoan, RenewLoan, ReturnLoan},
    loan::Loan,
    value_objects::{BookId, LoanId},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{LoanRequest, LoanResponse, RenewQuery};
use crate::api::error::ApiError;

// ============================================================================
// State
// ============================================================================

/// 貸出サービスのハンドラー間で共有される状態
#[derive(Clone)]
pub struct LoanState {
    pub deps: ServiceDependencies,
}

/// サーバーの現在日付（UTC）
fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn to_response(loan: Loan) -> Json<LoanResponse> {
    Json(LoanResponse::from_loan(loan, today()))
}

fn to_responses(loans: Vec<Loan>) -> Json<Vec<LoanResponse>> {
    let today = today();
    Json(
        loans
            .into_iter()
            .map(|loan| LoanResponse::from_loan(loan, today))
            .collect(),
    )
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 強制されるビジネスルール:
/// - 利用者のActiveな貸出が上限未満であること
/// - 書籍が貸出可能であること
///
/// カタログへの減算依頼が失敗しても貸出は作成され、`pending_adjustment`が残る。
pub async fn create_loan(
    State(state): State<Arc<LoanState>>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.validate(today()).map_err(ApiError::Validation)?;

    let loan = loan::create_loan(&state.deps, cmd).await?;

    Ok((StatusCode::CREATED, to_response(loan)))
}

/// POST /loans/:id/return - 書籍を返却
///
/// 延滞中の貸出も返却可能。
pub async fn return_loan(
    State(state): State<Arc<LoanState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
        returned_on: today(),
    };

    let loan = loan::return_loan(&state.deps, cmd).await?;

    Ok(to_response(loan))
}

/// POST /loans/:id/cancel - 貸出を取消
pub async fn cancel_loan(
    State(state): State<Arc<LoanState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = CancelLoan {
        loan_id: LoanId::from_uuid(loan_id),
    };

    let loan = loan::cancel_loan(&state.deps, cmd).await?;

    Ok(to_response(loan))
}

/// POST /loans/:id/renew?newDueDate=YYYY-MM-DD - 返却期限を更新
pub async fn renew_loan(
    State(state): State<Arc<LoanState>>,
    Path(loan_id): Path<Uuid>,
    Query(query): Query<RenewQuery>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = RenewLoan {
        loan_id: LoanId::from_uuid(loan_id),
        new_due_date: query.new_due_date,
        requested_on: today(),
    };

    let loan = loan::renew_loan(&state.deps, cmd).await?;

    Ok(to_response(loan))
}

/// POST /loans/update-overdue - 延滞更新バッチを実行
///
/// 今回Overdueへ遷移した貸出のみを返す。
pub async fn update_overdue_loans(
    State(state): State<Arc<LoanState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = loan::update_overdue_loans(&state.deps, today()).await?;
    Ok(to_responses(loans))
}

/// POST /loans/reconcile - 未反映の在庫調整をカタログへ再依頼
pub async fn reconcile(
    State(state): State<Arc<LoanState>>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let report = loan::reconcile_pending_adjustments(&state.deps).await?;
    Ok(Json(report))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /loans
pub async fn list_loans(
    State(state): State<Arc<LoanState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(loan::list_loans(&state.deps).await?))
}

/// GET /loans/:id
pub async fn get_loan(
    State(state): State<Arc<LoanState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = loan::get_loan(&state.deps, LoanId::from_uuid(loan_id)).await?;
    Ok(to_response(loan))
}

/// GET /loans/user/:email - 利用者の全貸出（履歴を含む）
pub async fn loans_by_user(
    State(state): State<Arc<LoanState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(loan::loans_by_user(&state.deps, &email).await?))
}

/// GET /loans/user/:email/active
pub async fn active_loans_by_user(
    State(state): State<Arc<LoanState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(
        loan::active_loans_by_user(&state.deps, &email).await?,
    ))
}

/// GET /loans/book/:book_id
pub async fn loans_by_book(
    State(state): State<Arc<LoanState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(
        loan::loans_by_book(&state.deps, BookId::from_uuid(book_id)).await?,
    ))
}

/// GET /loans/status/:status - ステータス名は大文字小文字を区別しない
pub async fn loans_by_status(
    State(state): State<Arc<LoanState>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let status = status.parse::<LoanStatus>().map_err(|message| {
        ApiError::Validation(BTreeMap::from([("status".to_string(), message)]))
    })?;

    Ok(to_responses(loan::loans_by_status(&state.deps, status).await?))
}

/// GET /loans/overdue - 延滞中の貸出（保存されたステータスではなく返却期限から判定）
pub async fn overdue_loans(
    State(state): State<Arc<LoanState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(loan::overdue_loans(&state.deps, today()).await?))
}

/// GET /loans/pending-reconciliation
pub async fn pending_reconciliation(
    State(state): State<Arc<LoanState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    Ok(to_responses(
        loan::list_pending_reconciliation(&state.deps).await?,
    ))
}
