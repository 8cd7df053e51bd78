use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::api::types::FieldErrors;
use crate::domain::{
    LoanStatus, PendingAdjustment,
    commands::CreateLoan,
    loan::{self, Loan},
    value_objects::BookId,
};

/// 貸出作成リクエスト（POST /loans）
#[derive(Debug, Default, Deserialize)]
pub struct LoanRequest {
    pub book_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// メールアドレスの簡易検証（local@domain.tld）
fn is_well_formed_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

impl LoanRequest {
    /// 入力を検証してコマンドに変換する
    ///
    /// 返却期限は`today`より後でなければならない。
    pub fn validate(self, today: NaiveDate) -> Result<CreateLoan, BTreeMap<String, String>> {
        let mut errors = FieldErrors::default();

        let book_id = self.book_id.unwrap_or_else(|| {
            errors.add("book_id", "book_id is required");
            Uuid::nil()
        });

        let user_email = errors.require_text("user_email", self.user_email);
        if !user_email.is_empty() && !is_well_formed_email(user_email.trim()) {
            errors.add("user_email", "user_email must be a valid email address");
        }

        let user_name = errors.require_text("user_name", self.user_name);

        let due_date = match self.due_date {
            Some(due_date) => {
                if due_date <= today {
                    errors.add("due_date", "due_date must be in the future");
                }
                due_date
            }
            None => {
                errors.add("due_date", "due_date is required");
                today
            }
        };

        errors.into_result()?;

        Ok(CreateLoan {
            book_id: BookId::from_uuid(book_id),
            user_email: user_email.trim().to_string(),
            user_name,
            due_date,
            notes: self.notes,
            loaned_on: today,
        })
    }
}

/// 返却期限更新のクエリパラメータ（POST /loans/:id/renew?newDueDate=YYYY-MM-DD）
#[derive(Debug, Deserialize)]
pub struct RenewQuery {
    #[serde(rename = "newDueDate")]
    pub new_due_date: NaiveDate,
}

/// 貸出レスポンス
///
/// `is_overdue`は保存されたステータスとは別に、応答時点の日付から導出する。
#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub notes: Option<String>,
    pub pending_adjustment: Option<PendingAdjustment>,
    pub is_overdue: bool,
}

impl LoanResponse {
    pub fn from_loan(loan: Loan, today: NaiveDate) -> Self {
        let is_overdue = loan::is_overdue(&loan, today);
        Self {
            id: loan.loan_id.value(),
            book_id: loan.book_id.value(),
            user_email: loan.user_email,
            user_name: loan.user_name,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            status: loan.status,
            notes: loan.notes,
            pending_adjustment: loan.pending_adjustment,
            is_overdue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn valid_request() -> LoanRequest {
        LoanRequest {
            book_id: Some(Uuid::new_v4()),
            user_email: Some("reader@example.com".to_string()),
            user_name: Some("Reader".to_string()),
            due_date: Some(today() + Duration::days(7)),
            notes: None,
        }
    }

    #[test]
    fn test_valid_request_converts_to_command() {
        let cmd = valid_request().validate(today()).unwrap();

        assert_eq!(cmd.user_email, "reader@example.com");
        assert_eq!(cmd.loaned_on, today());
        assert_eq!(cmd.due_date, today() + Duration::days(7));
    }

    #[test]
    fn test_due_date_today_is_rejected() {
        let request = LoanRequest {
            due_date: Some(today()),
            ..valid_request()
        };

        let errors = request.validate(today()).unwrap_err();
        assert!(errors.contains_key("due_date"));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let errors = LoanRequest::default().validate(today()).unwrap_err();

        assert!(errors.contains_key("book_id"));
        assert!(errors.contains_key("user_email"));
        assert!(errors.contains_key("user_name"));
        assert!(errors.contains_key("due_date"));
    }

    #[test]
    fn test_email_format() {
        assert!(is_well_formed_email("a@b.co"));
        assert!(!is_well_formed_email("reader"));
        assert!(!is_well_formed_email("@example.com"));
        assert!(!is_well_formed_email("reader@example"));
        assert!(!is_well_formed_email("reader@@example.com"));
        assert!(!is_well_formed_email("read er@example.com"));

        let request = LoanRequest {
            user_email: Some("not-an-email".to_string()),
            ..valid_request()
        };
        let errors = request.validate(today()).unwrap_err();
        assert_eq!(
            errors.get("user_email").map(String::as_str),
            Some("user_email must be a valid email address")
        );
    }
}
