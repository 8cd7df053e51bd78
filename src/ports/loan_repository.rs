use crate::domain::{
    LoanStatus, PendingAdjustment,
    loan::Loan,
    value_objects::{BookId, LoanId},
};
use async_trait::async_trait;
use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出リポジトリポート
///
/// 貸出コンテキストが所有する貸出記録の永続化を抽象化する。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 新しい貸出を登録する
    async fn insert(&self, loan: &Loan) -> Result<()>;

    /// 保存済みの貸出が`current`と一致する場合のみ`next`で置き換える
    ///
    /// 読み込み後に他の書き込みが入っていた場合は何も変更せず`false`を返す。
    /// 状態遷移はこのメソッドだけを通し、終端状態が古い読み込み結果で上書きされないようにする。
    async fn replace(&self, current: &Loan, next: &Loan) -> Result<bool>;

    /// 未反映マーカーだけを条件付きで書き換える
    ///
    /// 保存済みのマーカーが`expected`の場合のみ`replacement`にする。他の列は変更しない。
    async fn swap_pending_adjustment(
        &self,
        loan_id: LoanId,
        expected: PendingAdjustment,
        replacement: Option<PendingAdjustment>,
    ) -> Result<bool>;

    /// 延滞対象の貸出をOverdueへ遷移させ、遷移した貸出を返す
    ///
    /// 判定と更新を1回の書き込みで行う。判定条件は`find_overdue`と同じ。
    async fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>>;

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    async fn find_all(&self) -> Result<Vec<Loan>>;

    /// 利用者の全貸出（履歴を含む）
    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>>;

    /// 利用者のActiveな貸出
    async fn find_active_by_user_email(&self, user_email: &str) -> Result<Vec<Loan>>;

    /// 利用者のActiveな貸出件数
    ///
    /// 貸出上限の確認に使用される。
    async fn count_active_by_user_email(&self, user_email: &str) -> Result<usize>;

    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>>;

    async fn find_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>>;

    /// 延滞対象の貸出を検索する
    ///
    /// status が Active、due_date < today、return_date が未設定の貸出を返す。
    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Loan>>;

    /// カタログへ未反映の在庫調整を持つ貸出
    async fn find_pending_reconciliation(&self) -> Result<Vec<Loan>>;
}
