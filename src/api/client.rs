//! HTTP client for the marketplace API.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    api::{
        ApiError, ApiResponse, Page, PageRequest, ProductCatalog, VoucherCatalog,
        records::{ProductRecord, ShipmentQuoteRecord, VoucherRecord},
    },
    checkout::{AccessToken, TransactionRequest},
    shipments::{ShipmentQuoteProvider, ShipmentQuoteRequest},
    transactions::{CreatedTransactions, SubmissionError, TransactionGateway},
    uuids::ProductUuid,
};

/// Connection settings for the marketplace API.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Base URL, e.g. `"https://api.koperasi.example"`.
    pub base_url: String,

    /// Timeout applied to every request.
    pub timeout: Duration,
}

/// Client implementing every marketplace collaborator over HTTP and JSON.
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    config: MarketplaceConfig,
    http: Client,
}

impl MarketplaceClient {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(config: MarketplaceConfig) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Send a listing request and unwrap the `data` of the envelope.
    async fn fetch<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ApiError::UnexpectedResponse(format!(
                "{what} request failed with status {status}: {text}"
            )));
        }

        let envelope: ApiResponse<T> = response.json().await?;

        envelope.data.ok_or_else(|| {
            ApiError::UnexpectedResponse(format!("{what} response has no data"))
        })
    }

    /// Send a transaction request and interpret the outcome.
    async fn submit(
        &self,
        request: RequestBuilder,
    ) -> Result<CreatedTransactions, SubmissionError> {
        let response = request.send().await?;

        created_transactions(response).await
    }
}

async fn created_transactions(
    response: Response,
) -> Result<CreatedTransactions, SubmissionError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!(%status, "transaction request rejected");

        let rejection = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text);

        return Err(match rejection {
            Ok(envelope) => SubmissionError::Rejected {
                message: envelope.message,
                field_errors: envelope.errors.unwrap_or_default(),
            },
            Err(_err) => SubmissionError::Rejected {
                message: format!("transaction request failed with status {status}: {text}"),
                field_errors: BTreeMap::new(),
            },
        });
    }

    let reason = match serde_json::from_str::<ApiResponse<CreatedTransactions>>(&text) {
        Ok(ApiResponse {
            data: Some(created),
            ..
        }) => return Ok(created),
        Ok(_) => "response has no data".to_string(),
        Err(err) => err.to_string(),
    };

    warn!(%status, %reason, "transactions created but the response could not be read");

    Ok(CreatedTransactions::Unreadable { reason })
}

#[async_trait]
impl ProductCatalog for MarketplaceClient {
    async fn list_products(&self, page: PageRequest) -> Result<Page<ProductRecord>, ApiError> {
        debug!(page = page.page, per_page = page.per_page, "listing products");

        let request = self.http.get(self.url("/products")).query(&page);

        self.fetch("product listing", request).await
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, ApiError> {
        let request = self.http.get(self.url(&format!("/products/{product}")));

        self.fetch("product", request).await
    }
}

#[async_trait]
impl VoucherCatalog for MarketplaceClient {
    async fn list_vouchers(&self, page: PageRequest) -> Result<Page<VoucherRecord>, ApiError> {
        debug!(page = page.page, per_page = page.per_page, "listing vouchers");

        let request = self.http.get(self.url("/vouchers")).query(&page);

        self.fetch("voucher listing", request).await
    }
}

#[async_trait]
impl ShipmentQuoteProvider for MarketplaceClient {
    async fn quote(
        &self,
        request: ShipmentQuoteRequest,
    ) -> Result<Vec<ShipmentQuoteRecord>, ApiError> {
        let request = self.http.post(self.url("/shipments/cost")).json(&request);

        self.fetch("shipment cost", request).await
    }
}

#[async_trait]
impl TransactionGateway for MarketplaceClient {
    async fn create_transaction(
        &self,
        token: AccessToken,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError> {
        let request = self
            .http
            .post(self.url("/transactions"))
            .bearer_auth(token.expose())
            .json(&request);

        self.submit(request).await
    }

    async fn create_guest_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<CreatedTransactions, SubmissionError> {
        let request = self
            .http
            .post(self.url("/transactions/guest"))
            .json(&request);

        self.submit(request).await
    }
}
