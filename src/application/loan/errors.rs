use crate::domain::{LoanTransitionError, value_objects::LoanId};
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 貸出が見つからない
    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    /// 貸出上限を超えている
    #[error("Loan limit exceeded (max {max} active loans)")]
    LoanLimitExceeded { max: usize },

    /// 書籍が貸出不可（カタログに問い合わせできなかった場合を含む）
    #[error("Book is not available for loan")]
    BookNotAvailable,

    /// 現在の状態では許されない操作
    #[error("Invalid loan transition: {0}")]
    InvalidTransition(LoanTransitionError),

    /// 新しい返却期限が未来日ではない
    #[error("New due date must be after {today}")]
    InvalidDueDate { today: chrono::NaiveDate },

    /// 読み込みから書き込みまでの間に他の更新が続いた
    #[error("Loan {0} was modified concurrently, retry the request")]
    ConcurrentUpdate(LoanId),

    /// LoanRepositoryのエラー
    #[error("Loan repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<LoanTransitionError> for LoanApplicationError {
    fn from(err: LoanTransitionError) -> Self {
        LoanApplicationError::InvalidTransition(err)
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
