mod errors;
mod loan_service;
mod overdue_detection;
mod reconciliation;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    DEFAULT_MAX_ACTIVE_LOANS, LoanPolicy, ServiceDependencies, active_loans_by_user, cancel_loan,
    create_loan, get_loan, list_loans, loans_by_book, loans_by_status, loans_by_user,
    overdue_loans, renew_loan, return_loan,
};
pub use overdue_detection::update_overdue_loans;
pub use reconciliation::{
    ReconciliationReport, list_pending_reconciliation, reconcile_pending_adjustments,
};
