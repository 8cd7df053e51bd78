use super::LoanStatus;

/// 在庫冊数の不変条件違反
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyCountError {
    /// 総冊数が1未満
    NoCopies,
    /// 利用可能冊数が負数
    NegativeAvailable,
    /// 利用可能冊数が総冊数を超えている
    AvailableExceedsTotal,
    /// 利用可能な冊数がない（減算不可）
    NoneAvailable,
    /// 全冊が在庫にある（加算不可）
    AllCopiesOnShelf,
}

impl std::fmt::Display for CopyCountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            CopyCountError::NoCopies => "total copies must be at least 1",
            CopyCountError::NegativeAvailable => "available copies cannot be negative",
            CopyCountError::AvailableExceedsTotal => "available copies cannot exceed total copies",
            CopyCountError::NoneAvailable => "no copies available",
            CopyCountError::AllCopiesOnShelf => "all copies are already on the shelf",
        };
        f.write_str(msg)
    }
}

/// 貸出の状態遷移エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTransitionError {
    /// 現在の状態
    pub from: LoanStatus,
    /// 試みた操作
    pub action: &'static str,
}

impl std::fmt::Display for LoanTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} a loan in status {}", self.action, self.from)
    }
}

/// 更新（返却期限変更）のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewLoanError {
    /// Active以外の貸出は更新不可
    InvalidTransition(LoanTransitionError),
    /// 新しい返却期限が未来日ではない
    DueDateNotInFuture,
}

impl From<LoanTransitionError> for RenewLoanError {
    fn from(err: LoanTransitionError) -> Self {
        RenewLoanError::InvalidTransition(err)
    }
}
