use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::catalog::{CatalogState, handlers as catalog};
use super::fallback;
use super::loan::{LoanState, handlers as loan};

/// Creates the catalog service router
///
/// Query endpoints:
/// - GET /books, /books/:id, /books/isbn/:isbn, /books/available
/// - GET /books/search/author?name=, /books/search/title?name=
/// - GET /books/category/:category, /books/:id/availability
///
/// Command endpoints:
/// - POST /books, PUT /books/:id, DELETE /books/:id
/// - POST /books/:id/decrement, POST /books/:id/increment
pub fn create_catalog_router(state: Arc<CatalogState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/books", get(catalog::list_books).post(catalog::create_book))
        .route("/books/available", get(catalog::list_available))
        .route("/books/isbn/:isbn", get(catalog::get_book_by_isbn))
        .route("/books/search/author", get(catalog::search_by_author))
        .route("/books/search/title", get(catalog::search_by_title))
        .route("/books/category/:category", get(catalog::list_by_category))
        .route(
            "/books/:id",
            get(catalog::get_book)
                .put(catalog::update_book)
                .delete(catalog::delete_book),
        )
        .route("/books/:id/availability", get(catalog::check_availability))
        .route("/books/:id/decrement", post(catalog::decrement_copies))
        .route("/books/:id/increment", post(catalog::increment_copies))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the loan service router
///
/// Command endpoints:
/// - POST /loans
/// - POST /loans/:id/return, /loans/:id/cancel, /loans/:id/renew?newDueDate=
/// - POST /loans/update-overdue, /loans/reconcile
///
/// Query endpoints:
/// - GET /loans, /loans/:id, /loans/user/:email, /loans/user/:email/active
/// - GET /loans/book/:book_id, /loans/status/:status, /loans/overdue
/// - GET /loans/pending-reconciliation
pub fn create_loan_router(state: Arc<LoanState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/loans", get(loan::list_loans).post(loan::create_loan))
        .route("/loans/overdue", get(loan::overdue_loans))
        .route("/loans/update-overdue", post(loan::update_overdue_loans))
        .route(
            "/loans/pending-reconciliation",
            get(loan::pending_reconciliation),
        )
        .route("/loans/reconcile", post(loan::reconcile))
        .route("/loans/user/:email", get(loan::loans_by_user))
        .route("/loans/user/:email/active", get(loan::active_loans_by_user))
        .route("/loans/book/:book_id", get(loan::loans_by_book))
        .route("/loans/status/:status", get(loan::loans_by_status))
        .route("/loans/:id", get(loan::get_loan))
        .route("/loans/:id/return", post(loan::return_loan))
        .route("/loans/:id/cancel", post(loan::cancel_loan))
        .route("/loans/:id/renew", post(loan::renew_loan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the gateway fallback router
///
/// - GET /fallback/inventory, /fallback/loan → 503
pub fn create_gateway_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/fallback/inventory", get(fallback::inventory_unavailable))
        .route("/fallback/loan", get(fallback::loan_unavailable))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
