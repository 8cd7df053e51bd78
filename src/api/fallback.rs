use axum::{Json, http::StatusCode};

use super::types::ErrorResponse;

/// GET /fallback/inventory
///
/// ゲートウェイがカタログサービスに到達できない場合の応答。
/// コア処理のエラーは503を返さないため、「到達不能」と区別できる。
pub async fn inventory_unavailable() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new(
            "Inventory service is unavailable",
            "The catalog service is temporarily unavailable. Please try again later.",
        )),
    )
}

/// GET /fallback/loan
pub async fn loan_unavailable() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new(
            "Loan service is unavailable",
            "The loan service is temporarily unavailable. Please try again later.",
        )),
    )
}
