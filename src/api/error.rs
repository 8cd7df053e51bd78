use crate::application::{catalog::CatalogApplicationError, loan::LoanApplicationError};
use crate::domain::CopyCountError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogApplicationError),
    Loan(LoanApplicationError),
    /// 入力検証エラー（フィールド名 → メッセージ）
    Validation(BTreeMap<String, String>),
    /// JSONとして解釈できないリクエストボディ
    MalformedBody(String),
}

impl From<CatalogApplicationError> for ApiError {
    fn from(err: CatalogApplicationError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

fn validation_response(errors: BTreeMap<String, String>) -> Response {
    let body = ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
        .with_field_errors(errors);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// 500 Internal Server Error
///
/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージと失敗箇所のみを返す
fn internal_response(category: &str, err: &(dyn std::error::Error + Send + Sync)) -> Response {
    tracing::error!(category, error = %err, "Internal error");
    let body = ErrorResponse::new("INTERNAL_ERROR", "An unexpected error occurred")
        .with_category(category);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn copy_count_field(err: CopyCountError) -> &'static str {
    match err {
        CopyCountError::NoCopies => "total_copies",
        _ => "available_copies",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Validation(errors) => return validation_response(errors),
            ApiError::MalformedBody(message) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST", message)
            }

            // 404 Not Found - リクエストされたリソースが存在しない
            ApiError::Catalog(e @ CatalogApplicationError::BookNotFound(_)) => {
                (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", e.to_string())
            }
            ApiError::Loan(e @ LoanApplicationError::LoanNotFound(_)) => {
                (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", e.to_string())
            }

            // 409 Conflict - 一意制約・在庫数の不変条件・同時更新
            ApiError::Loan(e @ LoanApplicationError::ConcurrentUpdate(_)) => {
                (StatusCode::CONFLICT, "CONCURRENT_UPDATE", e.to_string())
            }
            ApiError::Catalog(e @ CatalogApplicationError::DuplicateIsbn(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_ISBN", e.to_string())
            }
            ApiError::Catalog(e @ CatalogApplicationError::CopyCountConflict { .. }) => {
                (StatusCode::CONFLICT, "COPY_COUNT_CONFLICT", e.to_string())
            }
            ApiError::Catalog(CatalogApplicationError::InvalidCopyCounts(e)) => {
                let mut errors = BTreeMap::new();
                errors.insert(copy_count_field(e).to_string(), e.to_string());
                return validation_response(errors);
            }

            // 422 Unprocessable Entity - ビジネスルール違反
            ApiError::Loan(e @ LoanApplicationError::LoanLimitExceeded { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_LIMIT_EXCEEDED",
                e.to_string(),
            ),
            ApiError::Loan(e @ LoanApplicationError::BookNotAvailable) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BOOK_NOT_AVAILABLE",
                e.to_string(),
            ),
            ApiError::Loan(LoanApplicationError::InvalidTransition(e)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_TRANSITION",
                e.to_string(),
            ),
            ApiError::Loan(e @ LoanApplicationError::InvalidDueDate { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_DATE",
                e.to_string(),
            ),

            // 500 Internal Server Error - システム障害
            ApiError::Catalog(CatalogApplicationError::RepositoryError(e)) => {
                return internal_response("book_repository", e.as_ref());
            }
            ApiError::Loan(LoanApplicationError::RepositoryError(e)) => {
                return internal_response("loan_repository", e.as_ref());
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
