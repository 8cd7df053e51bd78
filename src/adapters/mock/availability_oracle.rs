use crate::domain::value_objects::{BookId, CopyAdjustment};
use crate::ports::availability_oracle::{
    AdjustmentOutcome, AvailabilityCheck, AvailabilityOracle as AvailabilityOracleTrait,
    OracleFailure,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// スタブへの呼び出し記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleCall {
    CheckAvailability(BookId),
    Adjust(BookId, CopyAdjustment),
}

#[derive(Default)]
struct StubState {
    available_books: HashSet<BookId>,
    check_failure: Option<OracleFailure>,
    adjust_failure: Option<OracleFailure>,
    calls: Vec<OracleCall>,
}

/// AvailabilityOracleのスタブ実装
///
/// 貸出可能な書籍と失敗の有無をテストから設定でき、受けた呼び出しを記録する。
#[derive(Default)]
pub struct AvailabilityOracle {
    state: Mutex<StubState>,
}

impl AvailabilityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// テスト用に貸出可能な書籍を登録
    pub fn add_available_book(&self, book_id: BookId) {
        self.state().available_books.insert(book_id);
    }

    pub fn remove_available_book(&self, book_id: BookId) {
        self.state().available_books.remove(&book_id);
    }

    /// 以後の可否問い合わせを失敗させる（`None`で解除）
    pub fn fail_checks(&self, failure: Option<OracleFailure>) {
        self.state().check_failure = failure;
    }

    /// 以後の在庫調整依頼を失敗させる（`None`で解除）
    pub fn fail_adjustments(&self, failure: Option<OracleFailure>) {
        self.state().adjust_failure = failure;
    }

    pub fn calls(&self) -> Vec<OracleCall> {
        self.state().calls.clone()
    }

    /// 在庫調整依頼のみ
    pub fn adjustments(&self) -> Vec<(BookId, CopyAdjustment)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                OracleCall::Adjust(book_id, adjustment) => Some((*book_id, *adjustment)),
                OracleCall::CheckAvailability(_) => None,
            })
            .collect()
    }

    fn record_adjustment(&self, book_id: BookId, adjustment: CopyAdjustment) -> AdjustmentOutcome {
        let mut state = self.state();
        state.calls.push(OracleCall::Adjust(book_id, adjustment));
        match &state.adjust_failure {
            Some(failure) => AdjustmentOutcome::Degraded(failure.clone()),
            None => AdjustmentOutcome::Applied,
        }
    }
}

#[async_trait]
impl AvailabilityOracleTrait for AvailabilityOracle {
    async fn check_availability(&self, book_id: BookId) -> AvailabilityCheck {
        let mut state = self.state();
        state.calls.push(OracleCall::CheckAvailability(book_id));
        if let Some(failure) = &state.check_failure {
            return AvailabilityCheck::Degraded(failure.clone());
        }
        if state.available_books.contains(&book_id) {
            AvailabilityCheck::Available
        } else {
            AvailabilityCheck::NotAvailable
        }
    }

    async fn decrement(&self, book_id: BookId) -> AdjustmentOutcome {
        self.record_adjustment(book_id, CopyAdjustment::Decrement)
    }

    async fn increment(&self, book_id: BookId) -> AdjustmentOutcome {
        self.record_adjustment(book_id, CopyAdjustment::Increment)
    }
}
