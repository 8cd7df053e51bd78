use crate::domain::{
    LoanStatus, PendingAdjustment, loan,
    loan::Loan,
    value_objects::{BookId, LoanId},
};
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// LoanRepositoryのインメモリ実装
pub struct LoanRepository {
    loans: Mutex<HashMap<LoanId, Loan>>,
}

impl LoanRepository {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(HashMap::new()),
        }
    }

    fn loans(&self) -> Result<MutexGuard<'_, HashMap<LoanId, Loan>>> {
        Ok(self.loans.lock().map_err(|_| "loan store lock poisoned")?)
    }

    /// 条件に合う貸出を貸出日の新しい順で返す
    fn select(&self, predicate: impl Fn(&Loan) -> bool) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans()?
            .values()
            .filter(|l| predicate(l))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.loan_date.cmp(&a.loan_date));
        Ok(loans)
    }
}

impl Default for LoanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn insert(&self, loan: &Loan) -> Result<()> {
        let mut loans = self.loans()?;
        if loans.contains_key(&loan.loan_id) {
            return Err(format!("loan {} already exists", loan.loan_id).into());
        }
        loans.insert(loan.loan_id, loan.clone());
        Ok(())
    }

    async fn replace(&self, current: &Loan, next: &Loan) -> Result<bool> {
        let mut loans = self.loans()?;
        match loans.get_mut(&current.loan_id) {
            Some(stored) if stored == current => {
                *stored = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn swap_pending_adjustment(
        &self,
        loan_id: LoanId,
        expected: PendingAdjustment,
        replacement: Option<PendingAdjustment>,
    ) -> Result<bool> {
        let mut loans = self.loans()?;
        match loans.get_mut(&loan_id) {
            Some(stored) if stored.pending_adjustment == Some(expected) => {
                stored.pending_adjustment = replacement;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>> {
        let mut transitioned = Vec::new();
        for stored in self.loans()?.values_mut() {
            if let Ok(overdue) = loan::mark_overdue(stored, today) {
                *stored = overdue.clone();
                transitioned.push(overdue);
            }
        }
        transitioned.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(transitioned)
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.loans()?.get(&loan_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        self.select(|_| true)
    }

    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>> {
        self.select(|l| l.user_email == user_email)
    }

    async fn find_active_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>> {
        self.select(|l| l.user_email == user_email && l.status == LoanStatus::Active)
    }

    async fn count_active_by_user_email(&self, user_email: &str) -> Result<usize> {
        Ok(self
            .loans()?
            .values()
            .filter(|l| l.user_email == user_email && l.status == LoanStatus::Active)
            .count())
    }

    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>> {
        self.select(|l| l.book_id == book_id)
    }

    async fn find_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>> {
        self.select(|l| l.status == status)
    }

    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>> {
        let mut loans = self.select(|l| loan::is_overdue(l, today))?;
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(loans)
    }

    async fn find_pending_reconciliation(&self) -> Result<Vec<Loan>> {
        self.select(|l| l.pending_adjustment.is_some())
    }
}
