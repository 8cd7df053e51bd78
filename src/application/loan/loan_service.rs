use crate::domain::{
    self, LoanStatus, PendingAdjustment, RenewLoanError, commands::*, loan::Loan,
    value_objects::*,
};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};

/// 利用者1人あたりの既定の最大貸出冊数
pub const DEFAULT_MAX_ACTIVE_LOANS: usize = 5;

/// 状態遷移の条件付き書き込みを試みる回数
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// 貸出ポリシー（設定から注入される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub max_active_loans: usize,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_active_loans: DEFAULT_MAX_ACTIVE_LOANS,
        }
    }
}

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_repository: Arc<dyn LoanRepository>,
    pub availability_oracle: Arc<dyn AvailabilityOracle>,
    pub policy: LoanPolicy,
}

/// 貸出を読み込むヘルパー関数
///
/// # エラー
/// - RepositoryError: 読み込み失敗
/// - LoanNotFound: 貸出が存在しない
pub(super) async fn load_loan(
    loan_repository: &Arc<dyn LoanRepository>,
    loan_id: LoanId,
) -> Result<Loan> {
    loan_repository
        .get_by_id(loan_id)
        .await
        .map_err(LoanApplicationError::RepositoryError)?
        .ok_or(LoanApplicationError::LoanNotFound(loan_id))
}

/// 読み込み・ドメイン関数・条件付き書き込みを1つの状態遷移として実行する
///
/// 書き込みの直前に他の更新が入っていた場合は読み込みからやり直す。
/// やり直すたびにドメイン関数が最新の状態で再判定するため、終端状態を上書きすることはない。
async fn transition(
    deps: &ServiceDependencies,
    loan_id: LoanId,
    apply: impl Fn(&Loan) -> Result<Loan>,
) -> Result<Loan> {
    for _ in 0..MAX_TRANSITION_ATTEMPTS {
        let current = load_loan(&deps.loan_repository, loan_id).await?;
        let next = apply(&current)?;

        let written = deps
            .loan_repository
            .replace(&current, &next)
            .await
            .map_err(LoanApplicationError::RepositoryError)?;
        if written {
            return Ok(next);
        }

        tracing::debug!(loan_id = %loan_id, "Loan changed while transitioning; reloading");
    }

    Err(LoanApplicationError::ConcurrentUpdate(loan_id))
}

/// 在庫調整依頼の後のマーカーの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Settlement {
    /// カタログが適用し、マーカーを消した
    Cleared,
    /// 未反映のまま（マーカーが残っている）
    Pending,
    /// 依頼中に他の書き込みがマーカーを書き換えた（その書き込みが以後を引き継ぐ）
    Superseded,
}

/// 依頼結果から次のマーカーを決める
///
/// 減算の拒否は、それまでに結果不明の依頼がない場合（`first_request`）に限り「在庫は変わっていない」と確定できる。
/// 結果不明の失敗は、拒否済みの減算も「適用済みの可能性あり」に戻す。
fn next_marker(
    marker: PendingAdjustment,
    outcome: &AdjustmentOutcome,
    first_request: bool,
) -> Option<PendingAdjustment> {
    match outcome {
        AdjustmentOutcome::Applied => None,
        AdjustmentOutcome::Degraded(OracleFailure::Rejected { .. }) => match marker {
            PendingAdjustment::Decrement if first_request => {
                Some(PendingAdjustment::DecrementRejected)
            }
            other => Some(other),
        },
        AdjustmentOutcome::Degraded(OracleFailure::Unreachable(_)) => match marker {
            PendingAdjustment::DecrementRejected => Some(PendingAdjustment::Decrement),
            other => Some(other),
        },
    }
}

/// カタログへ在庫調整を依頼し、結果に応じてマーカーを書き換える
///
/// マーカーの書き換えは「保存済みのマーカーが`marker`のまま」の場合のみ行い、他の列には触れない。
/// 依頼中に返却などが確定していても、その状態を古い読み込み結果で戻すことはない。
///
/// 書き換えに失敗しても貸出自体は確定済みのため、呼び出し元へは成功を返す。
/// その場合マーカーは残り、突き合わせで再依頼される。
pub(super) async fn request_adjustment(
    deps: &ServiceDependencies,
    loan: Loan,
    marker: PendingAdjustment,
    first_request: bool,
) -> (Loan, Settlement) {
    let adjustment = marker.adjustment();
    let outcome = deps
        .availability_oracle
        .adjust(loan.book_id, adjustment)
        .await;

    if let AdjustmentOutcome::Degraded(failure) = &outcome {
        tracing::error!(
            loan_id = %loan.loan_id,
            book_id = %loan.book_id,
            adjustment = %adjustment,
            failure = %failure,
            "Catalog copy adjustment failed; loan left pending reconciliation"
        );
    }

    let next = next_marker(marker, &outcome, first_request);
    if next == Some(marker) {
        return (loan, Settlement::Pending);
    }

    match deps
        .loan_repository
        .swap_pending_adjustment(loan.loan_id, marker, next)
        .await
    {
        Ok(true) => {
            let settlement = if next.is_none() {
                Settlement::Cleared
            } else {
                Settlement::Pending
            };
            let loan = Loan {
                pending_adjustment: next,
                ..loan
            };
            (loan, settlement)
        }
        Ok(false) => {
            tracing::warn!(
                loan_id = %loan.loan_id,
                adjustment = %adjustment,
                "Pending marker changed while the catalog request was in flight"
            );
            (loan, Settlement::Superseded)
        }
        Err(e) => {
            tracing::error!(
                loan_id = %loan.loan_id,
                book_id = %loan.book_id,
                adjustment = %adjustment,
                error = %e,
                "Recording the catalog outcome failed; marker left as is"
            );
            (loan, Settlement::Pending)
        }
    }
}

/// 終端遷移の後、マーカーが残っていればカタログへ加算を依頼する
async fn release_copy(deps: &ServiceDependencies, loan: Loan) -> Loan {
    match loan.pending_adjustment {
        Some(marker) => request_adjustment(deps, loan, marker, false).await.0,
        None => loan,
    }
}

// ============================================================================
// コマンド
// ============================================================================

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 利用者のActiveな貸出が上限未満であること（上限到達時はカタログに問い合わせない）
/// - 書籍が貸出可能であること（問い合わせ失敗は貸出不可として扱う）
///
/// 貸出を保存した後にカタログへ減算を依頼する。依頼が失敗しても貸出は取り消さない。
pub async fn create_loan(deps: &ServiceDependencies, cmd: CreateLoan) -> Result<Loan> {
    // 1. 貸出上限確認
    let active_count = deps
        .loan_repository
        .count_active_by_user_email(&cmd.user_email)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    if active_count >= deps.policy.max_active_loans {
        tracing::info!(
            user_email = %cmd.user_email,
            active_count,
            "Loan rejected: active loan limit reached"
        );
        return Err(LoanApplicationError::LoanLimitExceeded {
            max: deps.policy.max_active_loans,
        });
    }

    // 2. 書籍の貸出可能性確認
    match deps
        .availability_oracle
        .check_availability(cmd.book_id)
        .await
    {
        AvailabilityCheck::Available => {}
        AvailabilityCheck::NotAvailable => {
            return Err(LoanApplicationError::BookNotAvailable);
        }
        AvailabilityCheck::Degraded(failure) => {
            tracing::warn!(
                book_id = %cmd.book_id,
                failure = %failure,
                "Availability check failed; treating book as unavailable"
            );
            return Err(LoanApplicationError::BookNotAvailable);
        }
    }

    // 3. ドメイン層の純粋関数を呼び出し、保存
    let loan = domain::loan::open_loan(cmd);
    deps.loan_repository
        .insert(&loan)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    tracing::info!(
        loan_id = %loan.loan_id,
        book_id = %loan.book_id,
        user_email = %loan.user_email,
        "Loan created"
    );

    // 4. カタログへ減算を依頼（ベストエフォート）
    let (loan, _) = request_adjustment(deps, loan, PendingAdjustment::Decrement, true).await;
    Ok(loan)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - ActiveまたはOverdueの貸出のみ返却可能
/// - 延滞していても返却は受け付ける
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<Loan> {
    let returned = transition(deps, cmd.loan_id, |loan| {
        domain::loan::return_loan(loan, cmd.returned_on).map_err(LoanApplicationError::from)
    })
    .await?;

    tracing::info!(loan_id = %returned.loan_id, "Loan returned");

    Ok(release_copy(deps, returned).await)
}

/// 貸出を取り消す
///
/// Activeの貸出のみ取消可能。
pub async fn cancel_loan(deps: &ServiceDependencies, cmd: CancelLoan) -> Result<Loan> {
    let cancelled = transition(deps, cmd.loan_id, |loan| {
        domain::loan::cancel_loan(loan).map_err(LoanApplicationError::from)
    })
    .await?;

    tracing::info!(loan_id = %cancelled.loan_id, "Loan cancelled");

    Ok(release_copy(deps, cancelled).await)
}

/// 返却期限を更新する
///
/// カタログとのやり取りはない。
pub async fn renew_loan(deps: &ServiceDependencies, cmd: RenewLoan) -> Result<Loan> {
    let renewed = transition(deps, cmd.loan_id, |loan| {
        domain::loan::renew_loan(loan, cmd.new_due_date, cmd.requested_on).map_err(|e| match e {
            RenewLoanError::InvalidTransition(t) => LoanApplicationError::InvalidTransition(t),
            RenewLoanError::DueDateNotInFuture => LoanApplicationError::InvalidDueDate {
                today: cmd.requested_on,
            },
        })
    })
    .await?;

    tracing::info!(
        loan_id = %renewed.loan_id,
        due_date = %renewed.due_date,
        "Loan renewed"
    );

    Ok(renewed)
}

// ============================================================================
// クエリ
// ============================================================================

pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    load_loan(&deps.loan_repository, loan_id).await
}

pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_all()
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

pub async fn loans_by_user(deps: &ServiceDependencies, user_email: &str) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_user_email(user_email)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

pub async fn active_loans_by_user(
    deps: &ServiceDependencies,
    user_email: &str,
) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_active_by_user_email(user_email)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

pub async fn loans_by_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_book_id(book_id)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

pub async fn loans_by_status(deps: &ServiceDependencies, status: LoanStatus) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_status(status)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 延滞中の貸出（Active、返却期限切れ、未返却）
pub async fn overdue_loans(
    deps: &ServiceDependencies,
    today: chrono::NaiveDate,
) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_overdue(today)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}
