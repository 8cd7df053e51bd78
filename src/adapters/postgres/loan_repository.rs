use crate::domain::{
    LoanStatus, PendingAdjustment,
    loan::Loan,
    value_objects::{BookId, LoanId},
};
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

const LOAN_COLUMNS: &str = "id, book_id, user_email, user_name, loan_date, due_date, \
                            return_date, status, notes, pending_adjustment";

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

/// PostgreSQLの行データをLoanに変換する
///
/// statusとpending_adjustmentの文字列からの変換でエラーハンドリングを行う。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.get("status");
    let status = LoanStatus::from_str(status_str).map_err(invalid_data)?;

    let pending_adjustment = row
        .get::<Option<&str>, _>("pending_adjustment")
        .map(PendingAdjustment::from_str)
        .transpose()
        .map_err(invalid_data)?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.get("id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        user_email: row.get("user_email"),
        user_name: row.get("user_name"),
        loan_date: row.get("loan_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        status,
        notes: row.get("notes"),
        pending_adjustment,
    })
}

/// LoanRepositoryのPostgreSQL実装
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn insert(&self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                id,
                book_id,
                user_email,
                user_name,
                loan_date,
                due_date,
                return_date,
                status,
                notes,
                pending_adjustment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(&loan.user_email)
        .bind(&loan.user_name)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status.as_str())
        .bind(&loan.notes)
        .bind(loan.pending_adjustment.map(|a| a.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 状態遷移を条件付きUPDATEで書き込む
    ///
    /// 変更され得る列がすべて`current`と一致する行のみを更新する。0行なら他の書き込みが先行している。
    async fn replace(&self, current: &Loan, next: &Loan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET due_date = $2,
                return_date = $3,
                status = $4,
                notes = $5,
                pending_adjustment = $6,
                updated_at = NOW()
            WHERE id = $1
              AND due_date = $7
              AND return_date IS NOT DISTINCT FROM $8
              AND status = $9
              AND notes IS NOT DISTINCT FROM $10
              AND pending_adjustment IS NOT DISTINCT FROM $11
            "#,
        )
        .bind(current.loan_id.value())
        .bind(next.due_date)
        .bind(next.return_date)
        .bind(next.status.as_str())
        .bind(&next.notes)
        .bind(next.pending_adjustment.map(|a| a.as_str()))
        .bind(current.due_date)
        .bind(current.return_date)
        .bind(current.status.as_str())
        .bind(&current.notes)
        .bind(current.pending_adjustment.map(|a| a.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn swap_pending_adjustment(
        &self,
        loan_id: LoanId,
        expected: PendingAdjustment,
        replacement: Option<PendingAdjustment>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE loans SET pending_adjustment = $3, updated_at = NOW() \
             WHERE id = $1 AND pending_adjustment = $2",
        )
        .bind(loan_id.value())
        .bind(expected.as_str())
        .bind(replacement.map(|a| a.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 延滞対象を1回のUPDATEで遷移させる
    ///
    /// 条件をUPDATE自体に含めるため、同時に返却された貸出は対象にならない。
    async fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>> {
        let sql = format!(
            "UPDATE loans SET status = 'OVERDUE', updated_at = NOW() \
             WHERE status = 'ACTIVE' AND due_date < $1 AND return_date IS NULL \
             RETURNING {}",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(today).fetch_all(&self.pool).await?;

        let mut loans = rows
            .iter()
            .map(map_row_to_loan)
            .collect::<Result<Vec<_>>>()?;
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(loans)
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let sql = format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans ORDER BY loan_date DESC, created_at DESC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE user_email = $1 ORDER BY loan_date DESC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// 利用者のActiveな貸出
    ///
    /// (user_email, status)のインデックスを使用する。
    async fn find_active_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE user_email = $1 AND status = 'ACTIVE' \
             ORDER BY loan_date DESC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_email)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn count_active_by_user_email(&self, user_email: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_email = $1 AND status = 'ACTIVE'",
        )
        .bind(user_email)
        .fetch_one(&self.pool)
        .await?;

        Ok(usize::try_from(count)?)
    }

    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE book_id = $1 ORDER BY loan_date DESC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(book_id.value())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE status = $1 ORDER BY loan_date DESC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// 延滞対象を検索（延滞更新バッチ用）
    ///
    /// (status, due_date)のインデックスを使用する。
    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans \
             WHERE status = 'ACTIVE' AND due_date < $1 AND return_date IS NULL \
             ORDER BY due_date ASC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_pending_reconciliation(&self) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE pending_adjustment IS NOT NULL ORDER BY updated_at ASC",
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(map_row_to_loan).collect()
    }
}
