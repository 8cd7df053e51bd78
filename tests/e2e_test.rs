use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDate, Utc};
use library_services::adapters::http::CatalogClient;
use library_services::adapters::mock::{InMemoryBookRepository, InMemoryLoanRepository};
use library_services::api::{
    catalog::CatalogState, create_catalog_router, create_gateway_router, create_loan_router,
    loan::LoanState,
};
use library_services::application::{
    catalog::{self, CatalogDependencies},
    loan::{LoanPolicy, ServiceDependencies},
};
use library_services::domain::value_objects::BookId;
use library_services::ports::{
    AdjustmentOutcome, AvailabilityCheck, AvailabilityOracle, OracleFailure,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// カタログサービスとその依存関係
struct CatalogHarness {
    deps: CatalogDependencies,
    router: Router,
    base_url: String,
}

/// カタログサービスを空きポートで起動する
///
/// 貸出サービスは実際のHTTPクライアント（CatalogClient）経由でこのサーバーを呼び出す。
async fn spawn_catalog() -> CatalogHarness {
    let deps = CatalogDependencies {
        book_repository: Arc::new(InMemoryBookRepository::new()),
    };
    let state = Arc::new(CatalogState { deps: deps.clone() });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = create_catalog_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, server).await.unwrap();
    });

    CatalogHarness {
        deps,
        router: create_catalog_router(state),
        base_url: format!("http://{}", addr),
    }
}

fn loan_app(catalog_base_url: &str) -> Router {
    let client =
        CatalogClient::new(catalog_base_url, std::time::Duration::from_secs(2)).unwrap();
    let deps = ServiceDependencies {
        loan_repository: Arc::new(InMemoryLoanRepository::new()),
        availability_oracle: Arc::new(client),
        policy: LoanPolicy::default(),
    };
    create_loan_router(Arc::new(LoanState { deps }))
}

/// 停止中のサービスを表すURL（一度確保したポートを解放する）
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// リクエストを送り、ステータスとJSONボディを返す（ボディが空ならNull）
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn create_book(catalog: &CatalogHarness, isbn: &str, total: i32, available: i32) -> Uuid {
    let (status, body) = send(
        &catalog.router,
        "POST",
        "/books",
        Some(json!({
            "isbn": isbn,
            "title": "Domain Modeling Made Functional",
            "author": "Scott Wlaschin",
            "total_copies": total,
            "available_copies": available,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    serde_json::from_value(body["id"].clone()).unwrap()
}

async fn available_copies(catalog: &CatalogHarness, book_id: Uuid) -> i32 {
    catalog::get_book(&catalog.deps, BookId::from_uuid(book_id))
        .await
        .unwrap()
        .copies
        .available()
}

fn loan_request(book_id: Uuid, email: &str, due_in_days: i64) -> Value {
    json!({
        "book_id": book_id,
        "user_email": email,
        "user_name": "Reader",
        "due_date": today() + Duration::days(due_in_days),
    })
}

// ============================================================================
// E2Eテスト: 正常系フロー
// ============================================================================

#[tokio::test]
async fn test_e2e_loan_and_return_adjusts_catalog() {
    // Arrange: 1冊だけの書籍
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);
    let book_id = create_book(&catalog, "978-1", 1, 1).await;

    // Step 1: 貸出作成（POST /loans）
    let (status, loan) = send(
        &loans,
        "POST",
        "/loans",
        Some(loan_request(book_id, "first@example.com", 7)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert_eq!(loan["status"], "ACTIVE");
    assert_eq!(loan["is_overdue"], false);
    assert_eq!(loan["pending_adjustment"], Value::Null);
    assert_eq!(available_copies(&catalog, book_id).await, 0);
    let loan_id = loan["id"].as_str().unwrap().to_string();

    // Step 2: 在庫0のため2件目は貸出不可
    let (status, body) = send(
        &loans,
        "POST",
        "/loans",
        Some(loan_request(book_id, "second@example.com", 7)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BOOK_NOT_AVAILABLE");
    let (_, second_user_loans) = send(&loans, "GET", "/loans/user/second@example.com", None).await;
    assert_eq!(second_user_loans, json!([]));

    // Step 3: 返却（POST /loans/:id/return）
    let (status, returned) = send(&loans, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "RETURNED");
    assert_eq!(returned["return_date"], json!(today()));
    assert_eq!(available_copies(&catalog, book_id).await, 1);

    // Step 4: 照会
    let (status, fetched) = send(&loans, "GET", &format!("/loans/{}", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "RETURNED");

    let (_, by_book) = send(&loans, "GET", &format!("/loans/book/{}", book_id), None).await;
    assert_eq!(by_book.as_array().unwrap().len(), 1);

    let (_, returned_loans) = send(&loans, "GET", "/loans/status/returned", None).await;
    assert_eq!(returned_loans.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_e2e_cancel_and_renew() {
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);
    let book_id = create_book(&catalog, "978-2", 2, 2).await;

    let (_, loan) = send(
        &loans,
        "POST",
        "/loans",
        Some(loan_request(book_id, "reader@example.com", 7)),
    )
    .await;
    let loan_id = loan["id"].as_str().unwrap().to_string();

    // 返却期限の更新
    let new_due = today() + Duration::days(30);
    let (status, renewed) = send(
        &loans,
        "POST",
        &format!("/loans/{}/renew?newDueDate={}", loan_id, new_due),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renewed["due_date"], json!(new_due));

    // 当日への更新は不可
    let (status, body) = send(
        &loans,
        "POST",
        &format!("/loans/{}/renew?newDueDate={}", loan_id, today()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INVALID_DATE");

    // 取消で在庫が戻る
    let (status, cancelled) =
        send(&loans, "POST", &format!("/loans/{}/cancel", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["return_date"], Value::Null);
    assert_eq!(available_copies(&catalog, book_id).await, 2);

    // 取消済みの返却は不可
    let (status, body) = send(&loans, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_e2e_overdue_sweep_endpoint() {
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);

    let (status, body) = send(&loans, "POST", "/loans/update-overdue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(&loans, "GET", "/loans/overdue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// ============================================================================
// E2Eテスト: カタログの不変条件
// ============================================================================

#[tokio::test]
async fn test_e2e_decrement_at_zero_conflicts() {
    let catalog = spawn_catalog().await;
    let book_id = create_book(&catalog, "978-3", 1, 0).await;

    let (status, body) = send(
        &catalog.router,
        "POST",
        &format!("/books/{}/decrement", book_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "COPY_COUNT_CONFLICT");
    assert_eq!(available_copies(&catalog, book_id).await, 0);

    let (status, body) = send(
        &catalog.router,
        "GET",
        &format!("/books/{}/availability", book_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));
}

#[tokio::test]
async fn test_e2e_catalog_queries_and_errors() {
    let catalog = spawn_catalog().await;
    create_book(&catalog, "978-4", 2, 2).await;

    let (status, body) = send(&catalog.router, "GET", "/books/isbn/978-4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_available"], true);
    assert_eq!(body["available_copies"], 2);

    let (_, body) = send(
        &catalog.router,
        "GET",
        "/books/search/author?name=wlaschin",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // ISBN重複は409
    let (status, body) = send(
        &catalog.router,
        "POST",
        "/books",
        Some(json!({"isbn": "978-4", "title": "Dup", "author": "A", "total_copies": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_ISBN");

    // 入力検証エラーは400とフィールド別メッセージ
    let (status, body) = send(&catalog.router, "POST", "/books", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["errors"]["isbn"].is_string());
    assert!(body["errors"]["total_copies"].is_string());

    // 存在しない書籍は404
    let (status, body) = send(
        &catalog.router,
        "GET",
        &format!("/books/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "BOOK_NOT_FOUND");
}

#[tokio::test]
async fn test_e2e_update_book() {
    let catalog = spawn_catalog().await;
    let book_id = create_book(&catalog, "978-5", 1, 1).await;

    let (status, body) = send(
        &catalog.router,
        "PUT",
        &format!("/books/{}", book_id),
        Some(json!({
            "isbn": "978-5",
            "title": "Revised",
            "author": "Scott Wlaschin",
            "total_copies": 3,
            "available_copies": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Revised");
    assert_eq!(body["total_copies"], 3);

    let (status, _) = send(
        &catalog.router,
        "PUT",
        &format!("/books/{}", Uuid::new_v4()),
        Some(json!({"isbn": "978-6", "title": "T", "author": "A", "total_copies": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_e2e_delete_book_with_active_loan_is_allowed() {
    // 貸出中の書籍も削除できる（貸出記録は残る）
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);
    let book_id = create_book(&catalog, "978-7", 1, 1).await;
    let (_, loan) = send(
        &loans,
        "POST",
        "/loans",
        Some(loan_request(book_id, "reader@example.com", 7)),
    )
    .await;
    let loan_id = loan["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &catalog.router,
        "DELETE",
        &format!("/books/{}", book_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, loan) = send(&loans, "GET", &format!("/loans/{}", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "ACTIVE");

    // 返却は受け付け、カタログへの加算は未反映として残る
    let (status, returned) =
        send(&loans, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["pending_adjustment"], "INCREMENT");

    let (_, pending) = send(&loans, "GET", "/loans/pending-reconciliation", None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
}

// ============================================================================
// E2Eテスト: カタログ停止時の挙動
// ============================================================================

#[tokio::test]
async fn test_e2e_unreachable_catalog_denies_loans() {
    let loans = loan_app(&closed_port_url().await);

    let (status, body) = send(
        &loans,
        "POST",
        "/loans",
        Some(loan_request(Uuid::new_v4(), "reader@example.com", 7)),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BOOK_NOT_AVAILABLE");

    let (_, all) = send(&loans, "GET", "/loans", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_e2e_reconcile_endpoint() {
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);

    let (status, report) = send(&loans, "POST", "/loans/reconcile", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        report,
        json!({"examined": 0, "cleared": 0, "still_pending": []})
    );
}

#[tokio::test]
async fn test_catalog_client_outcomes() {
    let catalog = spawn_catalog().await;
    let client = CatalogClient::new(&catalog.base_url, std::time::Duration::from_secs(2)).unwrap();
    let book_id = BookId::from_uuid(create_book(&catalog, "978-8", 1, 1).await);

    assert_eq!(
        client.check_availability(book_id).await,
        AvailabilityCheck::Available
    );
    assert_eq!(client.decrement(book_id).await, AdjustmentOutcome::Applied);
    assert_eq!(
        client.check_availability(book_id).await,
        AvailabilityCheck::NotAvailable
    );

    // カタログが「いいえ」と答えた場合はRejected
    assert!(matches!(
        client.decrement(book_id).await,
        AdjustmentOutcome::Degraded(OracleFailure::Rejected { status: 409, .. })
    ));
    assert!(matches!(
        client.check_availability(BookId::new()).await,
        AvailabilityCheck::Degraded(OracleFailure::Rejected { status: 404, .. })
    ));

    // 到達できない場合はUnreachable
    let offline =
        CatalogClient::new(closed_port_url().await, std::time::Duration::from_secs(2)).unwrap();
    assert!(matches!(
        offline.increment(book_id).await,
        AdjustmentOutcome::Degraded(OracleFailure::Unreachable(_))
    ));
}

// ============================================================================
// E2Eテスト: ゲートウェイとヘルスチェック
// ============================================================================

#[tokio::test]
async fn test_e2e_fallback_routes_return_503() {
    let gateway = create_gateway_router();

    for uri in ["/fallback/inventory", "/fallback/loan"] {
        let (status, body) = send(&gateway, "GET", uri, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_e2e_health_and_request_errors() {
    let catalog = spawn_catalog().await;
    let loans = loan_app(&catalog.base_url);

    for app in [&catalog.router, &loans, &create_gateway_router()] {
        let (status, body) = send(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));
    }

    let (status, body) = send(&loans, "GET", "/loans/status/lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].is_string());

    let (status, body) = send(
        &loans,
        "GET",
        &format!("/loans/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "LOAN_NOT_FOUND");

    let (status, body) = send(
        &loans,
        "POST",
        "/loans",
        Some(json!({"book_id": Uuid::new_v4(), "user_email": "bad", "user_name": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["user_email"].is_string());
    assert!(body["errors"]["user_name"].is_string());
    assert!(body["errors"]["due_date"].is_string());
}
