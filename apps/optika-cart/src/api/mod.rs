use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::cart::CartStore;
use crate::model::{CartLine, LineStatus};
use crate::sync::{CommitError, QuantityCommitter};

#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(service_base_url: impl AsRef<str>) -> Result<Self, ApiError> {
        let mut base = service_base_url.as_ref().trim().to_string();
        if base.is_empty() {
            return Err(ApiError::InvalidConfig(
                "cart service base url cannot be empty".into(),
            ));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            base = format!("http://{}", base);
        }
        let parsed = Url::parse(&base)
            .map_err(|err| ApiError::InvalidConfig(format!("invalid cart service url: {err}")))?;
        Ok(Self { base_url: parsed })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid cart service configuration: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
    #[error("cart service rejected request: {0}")]
    Server(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Typed client for the remote cart service.
///
/// After a successful quantity commit the client re-fetches the cart and
/// replaces the store's lines, so surfaces always render against the
/// service's latest confirmed state.
#[derive(Clone)]
pub struct CartApi {
    config: Arc<ApiConfig>,
    backend: Arc<dyn CartBackend>,
    store: Arc<CartStore>,
}

impl CartApi {
    pub fn new(config: ApiConfig, store: Arc<CartStore>) -> Result<Self, ApiError> {
        let backend = Arc::new(ReqwestCartBackend::new()?);
        Ok(Self {
            config: Arc::new(config),
            backend,
            store,
        })
    }

    #[cfg(test)]
    fn with_backend(config: ApiConfig, store: Arc<CartStore>, backend: Arc<dyn CartBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            store,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CartStore> {
        &self.store
    }

    /// Fetch the cart, replace the store's lines, and return the snapshot.
    pub async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        let response = self.backend.fetch_cart(self.config.base_url()).await?;
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "cart fetch failed".to_string());
            return Err(ApiError::Server(message));
        }
        let lines: Vec<CartLine> = response.items.into_iter().map(CartItemDto::into_line).collect();
        self.store.replace_lines(lines.clone());
        Ok(lines)
    }

    /// Commit a line's quantity, then refresh the cart on success.
    pub async fn set_item_quantity(
        &self,
        cart_item_id: &str,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = SetQuantityRequest {
            quantity,
            request_id: Uuid::new_v4().to_string(),
        };
        let response = self
            .backend
            .set_item_quantity(self.config.base_url(), cart_item_id, &request)
            .await?;
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "quantity update rejected".to_string());
            return Err(ApiError::Server(message));
        }
        debug!(cart_item_id, quantity, "quantity committed, refreshing cart");
        self.fetch_cart().await?;
        Ok(())
    }
}

#[async_trait]
impl QuantityCommitter for CartApi {
    async fn set_item_quantity(
        &self,
        cart_item_id: &str,
        quantity: u32,
    ) -> Result<(), CommitError> {
        CartApi::set_item_quantity(self, cart_item_id, quantity)
            .await
            .map_err(|err| CommitError::new(err.to_string()))
    }
}

#[async_trait]
trait CartBackend: Send + Sync {
    async fn fetch_cart(&self, base_url: &Url) -> Result<CartResponse, ApiError>;

    async fn set_item_quantity(
        &self,
        base_url: &Url,
        cart_item_id: &str,
        request: &SetQuantityRequest,
    ) -> Result<SetQuantityResponse, ApiError>;
}

struct ReqwestCartBackend {
    client: reqwest::Client,
}

impl ReqwestCartBackend {
    fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(8))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CartBackend for ReqwestCartBackend {
    async fn fetch_cart(&self, base_url: &Url) -> Result<CartResponse, ApiError> {
        let endpoint = base_url
            .join("cart")
            .map_err(|err| ApiError::InvalidConfig(format!("invalid cart endpoint: {err}")))?;
        let response = self.client.get(endpoint).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }
        let payload = response.json::<CartResponse>().await?;
        Ok(payload)
    }

    async fn set_item_quantity(
        &self,
        base_url: &Url,
        cart_item_id: &str,
        request: &SetQuantityRequest,
    ) -> Result<SetQuantityResponse, ApiError> {
        let endpoint = base_url
            .join(&format!("cart/items/{}", cart_item_id))
            .map_err(|err| {
                ApiError::InvalidConfig(format!(
                    "invalid quantity endpoint for item {cart_item_id}: {err}"
                ))
            })?;
        let response = self.client.patch(endpoint).json(request).send().await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }
        let payload = response.json::<SetQuantityResponse>().await?;
        Ok(payload)
    }
}

/// Prefer the service's own error message when a non-2xx response carries a
/// JSON body with one; fall back to the bare status.
async fn error_for_status(response: reqwest::Response) -> ApiError {
    let status = response.status();
    if let Ok(body) = response.json::<serde_json::Value>().await {
        if let Some(message) = body.get("message").and_then(serde_json::Value::as_str) {
            return ApiError::Server(message.to_string());
        }
    }
    ApiError::HttpStatus(status)
}

#[derive(Debug, Serialize)]
struct SetQuantityRequest {
    quantity: u32,
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct SetQuantityResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<CartItemDto>,
}

#[derive(Debug, Deserialize)]
struct CartItemDto {
    #[serde(default)]
    cart_item_id: Option<String>,
    variant_id: String,
    product_slug: String,
    quantity: u32,
    #[serde(default)]
    available_inventory: Option<u32>,
    #[serde(default = "default_status")]
    status: LineStatus,
}

fn default_status() -> LineStatus {
    LineStatus::Unknown
}

impl CartItemDto {
    fn into_line(self) -> CartLine {
        CartLine {
            cart_item_id: self.cart_item_id,
            variant_id: self.variant_id,
            product_slug: self.product_slug,
            quantity: self.quantity,
            available_inventory: self.available_inventory,
            status: self.status,
        }
    }
}
