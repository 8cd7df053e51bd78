use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId};

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoan {
    pub book_id: BookId,
    pub user_email: String,
    pub user_name: String,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub loaned_on: NaiveDate,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    pub returned_on: NaiveDate,
}

/// コマンド：貸出を取り消す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelLoan {
    pub loan_id: LoanId,
}

/// コマンド：返却期限を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewLoan {
    pub loan_id: LoanId,
    pub new_due_date: NaiveDate,
    pub requested_on: NaiveDate,
}
