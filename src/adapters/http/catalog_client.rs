use crate::domain::value_objects::BookId;
use crate::ports::availability_oracle::{
    AdjustmentOutcome, AvailabilityCheck, AvailabilityOracle, OracleFailure,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

/// カタログサービスのエラーレスポンス（`{error, message}`）
#[derive(Debug, Deserialize)]
struct CatalogErrorBody {
    message: String,
}

/// カタログサービスのHTTP APIを通じたAvailabilityOracle実装
///
/// - `GET  {base}/books/{id}/availability` → JSONの真偽値
/// - `POST {base}/books/{id}/decrement`
/// - `POST {base}/books/{id}/increment`
///
/// 2xx以外の応答は`Rejected`、接続失敗・タイムアウト・応答の解釈失敗は`Unreachable`として返す。
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn book_url(&self, book_id: BookId, action: &str) -> String {
        format!("{}/books/{}/{}", self.base_url, book_id, action)
    }

    async fn rejection(response: Response) -> OracleFailure {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<CatalogErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        OracleFailure::Rejected { status, message }
    }

    async fn post_adjustment(&self, book_id: BookId, action: &str) -> AdjustmentOutcome {
        let response = match self.client.post(self.book_url(book_id, action)).send().await {
            Ok(response) => response,
            Err(e) => return AdjustmentOutcome::Degraded(OracleFailure::Unreachable(e.to_string())),
        };

        if response.status().is_success() {
            AdjustmentOutcome::Applied
        } else {
            AdjustmentOutcome::Degraded(Self::rejection(response).await)
        }
    }
}

#[async_trait]
impl AvailabilityOracle for CatalogClient {
    async fn check_availability(&self, book_id: BookId) -> AvailabilityCheck {
        let url = self.book_url(book_id, "availability");
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return AvailabilityCheck::Degraded(OracleFailure::Unreachable(e.to_string())),
        };

        if !response.status().is_success() {
            return AvailabilityCheck::Degraded(Self::rejection(response).await);
        }

        match response.json::<bool>().await {
            Ok(true) => AvailabilityCheck::Available,
            Ok(false) => AvailabilityCheck::NotAvailable,
            Err(e) => AvailabilityCheck::Degraded(OracleFailure::Unreachable(format!(
                "unexpected availability body: {}",
                e
            ))),
        }
    }

    async fn decrement(&self, book_id: BookId) -> AdjustmentOutcome {
        self.post_adjustment(book_id, "decrement").await
    }

    async fn increment(&self, book_id: BookId) -> AdjustmentOutcome {
        self.post_adjustment(book_id, "increment").await
    }
}
