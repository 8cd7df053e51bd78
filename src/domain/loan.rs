use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    BookId, LoanId, LoanTransitionError, PendingAdjustment, RenewLoanError, commands::CreateLoan,
};

// ============================================================================
// 貸出ステータス
// ============================================================================

/// 貸出ステータス
///
/// 遷移：
/// - Active → Overdue（延滞バッチのみ）
/// - Active | Overdue → Returned（返却）
/// - Active → Cancelled（取消）
///
/// Returned, Cancelledは終端状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 返却済み
    Returned,
    /// 延滞中
    Overdue,
    /// 取消済み
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::Overdue => "OVERDUE",
            LoanStatus::Cancelled => "CANCELLED",
        }
    }

    /// 終端状態か（これ以上の変更を受け付けない）
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Cancelled)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    /// 大文字小文字を区別せずにパースする（パスパラメータ用）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(LoanStatus::Active),
            "RETURNED" => Ok(LoanStatus::Returned),
            "OVERDUE" => Ok(LoanStatus::Overdue),
            "CANCELLED" => Ok(LoanStatus::Cancelled),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// ============================================================================
// 貸出集約
// ============================================================================

/// Loan集約 - 1冊の書籍の1回の貸出
///
/// 不変条件：`return_date`はstatusがReturnedのときに限り存在する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    // 識別子
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,

    // 借り手
    pub user_email: String,
    pub user_name: String,

    // 貸出管理の責務
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub notes: Option<String>,

    /// カタログへ未反映の在庫調整
    ///
    /// 状態遷移と同じ書き込みで記録し、カタログが適用を確認した時点でのみ消す。
    /// 残っている貸出は突き合わせ（reconciliation）の対象となる。
    pub pending_adjustment: Option<PendingAdjustment>,
}

/// 純粋関数：貸出を開始する
///
/// 状態はActive、貸出日は`cmd.loaned_on`。
/// カタログへの減算依頼を未反映の調整として記録する。
pub fn open_loan(cmd: CreateLoan) -> Loan {
    Loan {
        loan_id: LoanId::new(),
        book_id: cmd.book_id,
        user_email: cmd.user_email,
        user_name: cmd.user_name,
        loan_date: cmd.loaned_on,
        due_date: cmd.due_date,
        return_date: None,
        status: LoanStatus::Active,
        notes: cmd.notes,
        pending_adjustment: Some(PendingAdjustment::Decrement),
    }
}

/// 終端遷移後のマーカーを決める
///
/// カタログが減算を拒否したと分かっている場合に限り、返却分の加算と相殺して依頼を省く。
/// 結果が不明な減算は適用済みとみなし、加算を依頼する。
fn release_copy(pending: Option<PendingAdjustment>) -> Option<PendingAdjustment> {
    match pending {
        Some(PendingAdjustment::DecrementRejected) => None,
        _ => Some(PendingAdjustment::Increment),
    }
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - ActiveまたはOverdueの貸出のみ返却可能
/// - 延滞していても返却は受け付ける
///
/// 副作用なし。返却済みの貸出を返す。マーカーが残っていればカタログへ依頼する。
pub fn return_loan(loan: &Loan, returned_on: NaiveDate) -> Result<Loan, LoanTransitionError> {
    if !matches!(loan.status, LoanStatus::Active | LoanStatus::Overdue) {
        return Err(LoanTransitionError {
            from: loan.status,
            action: "return",
        });
    }

    Ok(Loan {
        return_date: Some(returned_on),
        status: LoanStatus::Returned,
        pending_adjustment: release_copy(loan.pending_adjustment),
        ..loan.clone()
    })
}

/// 純粋関数：貸出を取り消す
///
/// Activeの貸出のみ取消可能。return_dateは設定しない。
pub fn cancel_loan(loan: &Loan) -> Result<Loan, LoanTransitionError> {
    if loan.status != LoanStatus::Active {
        return Err(LoanTransitionError {
            from: loan.status,
            action: "cancel",
        });
    }

    Ok(Loan {
        status: LoanStatus::Cancelled,
        pending_adjustment: release_copy(loan.pending_adjustment),
        ..loan.clone()
    })
}

/// 純粋関数：返却期限を更新する
///
/// ビジネスルール：
/// - Activeの貸出のみ更新可能
/// - 新しい返却期限は`today`より後（当日は不可）
///
/// 返却期限以外は変更しない。カタログとのやり取りはない。
pub fn renew_loan(
    loan: &Loan,
    new_due_date: NaiveDate,
    today: NaiveDate,
) -> Result<Loan, RenewLoanError> {
    if loan.status != LoanStatus::Active {
        return Err(LoanTransitionError {
            from: loan.status,
            action: "renew",
        }
        .into());
    }
    if new_due_date <= today {
        return Err(RenewLoanError::DueDateNotInFuture);
    }

    Ok(Loan {
        due_date: new_due_date,
        ..loan.clone()
    })
}

/// 純粋関数：延滞状態へ遷移させる（延滞バッチ専用）
///
/// `is_overdue`を満たす貸出のみ遷移可能。
pub fn mark_overdue(loan: &Loan, today: NaiveDate) -> Result<Loan, LoanTransitionError> {
    if !is_overdue(loan, today) {
        return Err(LoanTransitionError {
            from: loan.status,
            action: "mark overdue",
        });
    }

    Ok(Loan {
        status: LoanStatus::Overdue,
        ..loan.clone()
    })
}

/// 純粋関数：延滞判定（派生値）
///
/// 保存されたOverdueステータスとは別物。レスポンス整形と延滞バッチの抽出条件に使う。
pub fn is_overdue(loan: &Loan, today: NaiveDate) -> bool {
    loan.status == LoanStatus::Active && loan.due_date < today && loan.return_date.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn create_cmd(due_in_days: i64) -> CreateLoan {
        CreateLoan {
            book_id: BookId::new(),
            user_email: "reader@example.com".to_string(),
            user_name: "Reader".to_string(),
            due_date: today() + Duration::days(due_in_days),
            notes: None,
            loaned_on: today(),
        }
    }

    fn settled_active_loan() -> Loan {
        Loan {
            pending_adjustment: None,
            ..open_loan(create_cmd(14))
        }
    }

    // TDD: open_loan() のテスト
    #[test]
    fn test_open_loan_creates_active_loan() {
        let cmd = create_cmd(7);
        let book_id = cmd.book_id;

        let loan = open_loan(cmd);

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.book_id, book_id);
        assert_eq!(loan.loan_date, today());
        assert_eq!(loan.due_date, today() + Duration::days(7));
        assert_eq!(loan.return_date, None);
        assert_eq!(loan.pending_adjustment, Some(PendingAdjustment::Decrement));
    }

    // TDD: return_loan() のテスト
    #[test]
    fn test_return_active_loan() {
        let loan = settled_active_loan();
        let returned_on = today() + Duration::days(3);

        let returned = return_loan(&loan, returned_on).unwrap();

        assert_eq!(returned.status, LoanStatus::Returned);
        assert_eq!(returned.return_date, Some(returned_on));
        assert_eq!(returned.pending_adjustment, Some(PendingAdjustment::Increment));
    }

    #[test]
    fn test_return_overdue_loan() {
        let mut loan = settled_active_loan();
        loan.status = LoanStatus::Overdue;

        let returned = return_loan(&loan, today()).unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert_eq!(returned.return_date, Some(today()));
    }

    #[test]
    fn test_return_cancelled_loan_fails() {
        let loan = settled_active_loan();
        let cancelled = cancel_loan(&loan).unwrap();

        let result = return_loan(&cancelled, today());
        assert_eq!(
            result.unwrap_err(),
            LoanTransitionError {
                from: LoanStatus::Cancelled,
                action: "return",
            }
        );
    }

    #[test]
    fn test_return_twice_fails() {
        let loan = settled_active_loan();
        let returned = return_loan(&loan, today()).unwrap();

        assert!(return_loan(&returned, today()).is_err());
    }

    #[test]
    fn test_return_offsets_rejected_decrement() {
        // カタログが減算を拒否した貸出を返却すると、加算依頼は不要になる
        let loan = Loan {
            pending_adjustment: Some(PendingAdjustment::DecrementRejected),
            ..open_loan(create_cmd(7))
        };

        let returned = return_loan(&loan, today()).unwrap();

        assert_eq!(returned.pending_adjustment, None);
        assert_eq!(returned.status, LoanStatus::Returned);
    }

    #[test]
    fn test_return_with_unconfirmed_decrement_requests_increment() {
        // 減算の結果が不明な場合はカタログで適用済みの可能性があるため、加算を依頼する
        let loan = open_loan(create_cmd(7));

        let returned = return_loan(&loan, today()).unwrap();
        assert_eq!(returned.pending_adjustment, Some(PendingAdjustment::Increment));

        let cancelled = cancel_loan(&loan).unwrap();
        assert_eq!(cancelled.pending_adjustment, Some(PendingAdjustment::Increment));
    }

    // TDD: cancel_loan() のテスト
    #[test]
    fn test_cancel_active_loan() {
        let loan = settled_active_loan();

        let cancelled = cancel_loan(&loan).unwrap();

        assert_eq!(cancelled.status, LoanStatus::Cancelled);
        assert_eq!(cancelled.return_date, None);
        assert_eq!(cancelled.pending_adjustment, Some(PendingAdjustment::Increment));
    }

    #[test]
    fn test_cancel_overdue_loan_fails() {
        let mut loan = settled_active_loan();
        loan.status = LoanStatus::Overdue;

        assert!(cancel_loan(&loan).is_err());
    }

    // TDD: renew_loan() のテスト
    #[test]
    fn test_renew_updates_due_date_only() {
        let loan = settled_active_loan();
        let new_due = today() + Duration::days(30);

        let renewed = renew_loan(&loan, new_due, today()).unwrap();

        assert_eq!(renewed.due_date, new_due);
        assert_eq!(renewed.status, LoanStatus::Active);
        assert_eq!(renewed.loan_date, loan.loan_date);
        assert_eq!(renewed.pending_adjustment, loan.pending_adjustment);
    }

    #[test]
    fn test_renew_with_today_fails() {
        let loan = settled_active_loan();

        let result = renew_loan(&loan, today(), today());
        assert_eq!(result.unwrap_err(), RenewLoanError::DueDateNotInFuture);
    }

    #[test]
    fn test_renew_with_past_date_fails() {
        let loan = settled_active_loan();

        let result = renew_loan(&loan, today() - Duration::days(1), today());
        assert_eq!(result.unwrap_err(), RenewLoanError::DueDateNotInFuture);
    }

    #[test]
    fn test_renew_returned_loan_fails() {
        let loan = settled_active_loan();
        let returned = return_loan(&loan, today()).unwrap();

        let result = renew_loan(&returned, today() + Duration::days(5), today());
        assert!(matches!(
            result.unwrap_err(),
            RenewLoanError::InvalidTransition(_)
        ));
    }

    // TDD: is_overdue() / mark_overdue() のテスト
    #[test]
    fn test_is_overdue_only_after_due_date() {
        let loan = settled_active_loan();

        assert!(!is_overdue(&loan, loan.due_date));
        assert!(is_overdue(&loan, loan.due_date + Duration::days(1)));
    }

    #[test]
    fn test_is_overdue_false_for_stored_overdue_status() {
        // 派生判定はActiveのみを対象とする（保存済みOverdueとは区別する）
        let mut loan = settled_active_loan();
        loan.status = LoanStatus::Overdue;

        assert!(!is_overdue(&loan, loan.due_date + Duration::days(1)));
    }

    #[test]
    fn test_mark_overdue() {
        let loan = settled_active_loan();
        let later = loan.due_date + Duration::days(2);

        let overdue = mark_overdue(&loan, later).unwrap();
        assert_eq!(overdue.status, LoanStatus::Overdue);
        assert_eq!(overdue.return_date, None);

        // 2回目は遷移しない
        assert!(mark_overdue(&overdue, later).is_err());
    }

    #[test]
    fn test_mark_overdue_before_due_date_fails() {
        let loan = settled_active_loan();
        assert!(mark_overdue(&loan, today()).is_err());
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("active".parse::<LoanStatus>(), Ok(LoanStatus::Active));
        assert_eq!("Overdue".parse::<LoanStatus>(), Ok(LoanStatus::Overdue));
        assert!("lost".parse::<LoanStatus>().is_err());
        assert!(LoanStatus::Returned.is_terminal());
        assert!(!LoanStatus::Overdue.is_terminal());
    }
}
