use crate::application::catalog::{self, CatalogDependencies};
use crate::domain::value_objects::BookId;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{BookRequest, BookResponse, SearchQuery};
use crate::api::error::ApiError;

/// カタログサービスのハンドラー間で共有される状態
#[derive(Clone)]
pub struct CatalogState {
    pub deps: CatalogDependencies,
}

fn to_responses(books: Vec<crate::domain::book::Book>) -> Json<Vec<BookResponse>> {
    Json(books.into_iter().map(BookResponse::from).collect())
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /books
pub async fn list_books(
    State(state): State<Arc<CatalogState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    Ok(to_responses(catalog::list_books(&state.deps).await?))
}

/// GET /books/:id
pub async fn get_book(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book(&state.deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}

/// GET /books/isbn/:isbn
pub async fn get_book_by_isbn(
    State(state): State<Arc<CatalogState>>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book_by_isbn(&state.deps, &isbn).await?;
    Ok(Json(book.into()))
}

/// GET /books/search/author?name=
pub async fn search_by_author(
    State(state): State<Arc<CatalogState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    Ok(to_responses(
        catalog::search_by_author(&state.deps, &query.name).await?,
    ))
}

/// GET /books/search/title?name=
pub async fn search_by_title(
    State(state): State<Arc<CatalogState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    Ok(to_responses(
        catalog::search_by_title(&state.deps, &query.name).await?,
    ))
}

/// GET /books/category/:category
pub async fn list_by_category(
    State(state): State<Arc<CatalogState>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    Ok(to_responses(
        catalog::list_by_category(&state.deps, &category).await?,
    ))
}

/// GET /books/available
pub async fn list_available(
    State(state): State<Arc<CatalogState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    Ok(to_responses(catalog::list_available(&state.deps).await?))
}

/// GET /books/:id/availability - 貸出可否（真偽値のみを返す）
pub async fn check_availability(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<bool>, ApiError> {
    let available = catalog::check_availability(&state.deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(available))
}

// ============================================================================
// Command handlers (POST / PUT / DELETE)
// ============================================================================

/// POST /books - 書籍を登録
pub async fn create_book(
    State(state): State<Arc<CatalogState>>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = payload?;
    let input = req.validate().map_err(ApiError::Validation)?;

    let book = catalog::create_book(&state.deps, input).await?;

    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PUT /books/:id - 書籍の全フィールドを更新
pub async fn update_book(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Json(req) = payload?;
    let input = req.validate().map_err(ApiError::Validation)?;

    let book = catalog::update_book(&state.deps, BookId::from_uuid(book_id), input).await?;

    Ok(Json(book.into()))
}

/// DELETE /books/:id
pub async fn delete_book(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_book(&state.deps, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /books/:id/decrement - 利用可能冊数を1減らす
///
/// 在庫0の場合は409。
pub async fn decrement_copies(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book =
        catalog::decrement_available_copies(&state.deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}

/// POST /books/:id/increment - 利用可能冊数を1増やす
///
/// 全冊在庫の場合は409。
pub async fn increment_copies(
    State(state): State<Arc<CatalogState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book =
        catalog::increment_available_copies(&state.deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}
