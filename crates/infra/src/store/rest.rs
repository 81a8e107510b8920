//! Hosted store client speaking the PostgREST dialect.
//!
//! Tables and the balance view are reached under `{url}/rest/v1/<relation>`;
//! movements go through the `record_stock_move` function (`/rpc/...`) so the
//! outbound check and the insert run in one database transaction.
//!
//! Projects that never installed that function (`PGRST202` / `42883`) get a
//! plain insert into `stock_moves` instead. On that path only the service's
//! balance pre-check guards outbound movements, so it is not atomic.
//!
//! ## Error Mapping
//!
//! | Response | StoreError |
//! |----------|------------|
//! | code `23505` | `DuplicateSku` |
//! | code `23503` | `UnknownProduct` |
//! | code `P0001`, message `insufficient_stock` | `InsufficientStock` (available from `details`) |
//! | code `42P01` / `PGRST205` | `ViewUnavailable` |
//! | HTTP 401 / 403, 5xx, transport errors, timeouts | `Connectivity` |
//! | access key that is not a valid header value | `Configuration` |
//! | body that does not decode into the expected rows | `MalformedRow` |
//! | anything else | `Rejected` |

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tracing::{instrument, warn};

use stockledger_core::ProductId;
use stockledger_inventory::{BalanceRow, Movement, NewMovement, NewProduct, Product};

use super::{InventoryStore, StoreError};

const PRODUCT_COLUMNS: &str = "id,sku,name,unit,created_at";
const MOVE_COLUMNS: &str = "id,product_id,move_type,qty,note,created_at";
const BALANCE_COLUMNS: &str = "product_id,sku,name,unit,balance";

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// SQLSTATE / PostgREST codes meaning "no such function".
const FUNCTION_NOT_FOUND: [&str; 2] = ["PGRST202", "42883"];

/// A failed request, before mapping. Kept raw so callers can react to
/// specific codes.
enum Failure {
    Store(StoreError),
    Api(StatusCode, ApiError),
}

impl Failure {
    fn into_store_error(self, operation: &str) -> StoreError {
        match self {
            Failure::Store(e) => e,
            Failure::Api(status, err) => map_api_error(operation, status, err),
        }
    }

    fn is_missing_function(&self) -> bool {
        matches!(
            self,
            Failure::Api(_, ApiError { code: Some(code), .. })
                if FUNCTION_NOT_FOUND.contains(&code.as_str())
        )
    }
}

#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    // Set once the RPC is known to be missing; clones share it.
    rpc_missing: Arc<AtomicBool>,
}

impl RestStore {
    /// `url` is the service root (e.g. `https://xyz.supabase.co`); `key` is sent
    /// both as `apikey` and as a bearer token.
    pub fn new(url: &str, key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();

        let invalid_key =
            |_| StoreError::Configuration("access key is not a valid header value".to_string());
        let mut api_key = HeaderValue::from_str(key).map_err(invalid_key)?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid_key)?;
        bearer.set_sensitive(true);

        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            rpc_missing: Arc::new(AtomicBool::new(false)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<JsonValue, StoreError> {
        self.send_raw(operation, request)
            .await
            .map_err(|f| f.into_store_error(operation))
    }

    async fn send_raw(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<JsonValue, Failure> {
        let connectivity = |e: reqwest::Error| {
            Failure::Store(StoreError::Connectivity(format!("{operation}: {e}")))
        };

        let response = request.send().await.map_err(connectivity)?;
        let status = response.status();
        let body = response.bytes().await.map_err(connectivity)?;

        if status.is_success() {
            if body.is_empty() {
                return Ok(JsonValue::Null);
            }
            return serde_json::from_slice(&body).map_err(|e| {
                Failure::Store(StoreError::MalformedRow(format!(
                    "{operation}: response is not JSON: {e}"
                )))
            });
        }

        let api_error: ApiError = serde_json::from_slice(&body).unwrap_or_default();
        Err(Failure::Api(status, api_error))
    }

    /// Plain insert used when the `record_stock_move` function is absent.
    async fn insert_move(&self, movement: &NewMovement) -> Result<Movement, StoreError> {
        let request = self
            .client
            .post(self.url("stock_moves"))
            .query(&[("select", MOVE_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(movement);

        let body = self
            .send("insert_move", request)
            .await
            .map_err(|e| e.for_product(movement.product_id))?;
        decode_single("insert_move", body)
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let body = self.send(operation, request).await?;
        decode_rows(operation, body)
    }
}

fn decode_rows<T: DeserializeOwned>(
    operation: &str,
    body: JsonValue,
) -> Result<Vec<T>, StoreError> {
    serde_json::from_value(body).map_err(|e| StoreError::MalformedRow(format!("{operation}: {e}")))
}

/// PostgREST answers with an array for table inserts and a bare object for
/// functions returning a single composite; accept either.
fn decode_single<T: DeserializeOwned>(operation: &str, body: JsonValue) -> Result<T, StoreError> {
    let value = match body {
        JsonValue::Array(mut rows) if rows.len() == 1 => rows.remove(0),
        JsonValue::Array(rows) => {
            return Err(StoreError::MalformedRow(format!(
                "{operation}: expected exactly one row, got {}",
                rows.len()
            )));
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| StoreError::MalformedRow(format!("{operation}: {e}")))
}

fn map_api_error(operation: &str, status: StatusCode, err: ApiError) -> StoreError {
    let message = err.message.clone().unwrap_or_default();
    let describe = || {
        let mut s = format!("{operation}: HTTP {status}");
        if !message.is_empty() {
            s.push_str(": ");
            s.push_str(&message);
        }
        if let Some(hint) = &err.hint {
            s.push_str(&format!(" (hint: {hint})"));
        }
        s
    };

    match err.code.as_deref() {
        Some("23505") => StoreError::DuplicateSku(String::new()),
        Some("23503") => StoreError::UnknownProduct(ProductId::from_uuid(uuid::Uuid::nil())),
        Some("P0001") if message == "insufficient_stock" => {
            match err.details.as_deref().map(str::trim).map(Decimal::from_str) {
                Some(Ok(available)) => StoreError::InsufficientStock {
                    available: available.normalize(),
                },
                _ => StoreError::MalformedRow(format!(
                    "{operation}: insufficient_stock without a numeric balance in details"
                )),
            }
        }
        Some("42P01") | Some("PGRST205") => StoreError::ViewUnavailable(describe()),
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            StoreError::Connectivity(format!("permission denied: {}", describe()))
        }
        _ if status.is_server_error() => StoreError::Connectivity(describe()),
        _ => StoreError::Rejected(describe()),
    }
}

#[async_trait::async_trait]
impl InventoryStore for RestStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    #[instrument(skip(self), err)]
    async fn ping(&self) -> Result<(), StoreError> {
        let request = self
            .client
            .get(self.url("products"))
            .query(&[("select", "id"), ("limit", "1")]);
        self.send("ping", request).await.map(|_| ())
    }

    #[instrument(skip(self, product), fields(sku = %product.sku), err)]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let request = self
            .client
            .post(self.url("products"))
            .query(&[("select", PRODUCT_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(product);

        let body = self
            .send("insert_product", request)
            .await
            .map_err(|e| e.for_sku(&product.sku))?;
        decode_single("insert_product", body)
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let request = self
            .client
            .get(self.url("products"))
            .query(&[("select", PRODUCT_COLUMNS), ("order", "created_at.desc")]);
        self.fetch_rows("list_products", request).await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn product_balance(&self, product_id: ProductId) -> Result<Decimal, StoreError> {
        #[derive(Deserialize)]
        struct Row {
            balance: Decimal,
        }

        let request = self.client.get(self.url("stock_balance")).query(&[
            ("select", "balance".to_string()),
            ("product_id", format!("eq.{product_id}")),
        ]);
        let rows: Vec<Row> = self.fetch_rows("product_balance", request).await?;

        rows.into_iter()
            .next()
            .map(|r| r.balance.normalize())
            .ok_or(StoreError::UnknownProduct(product_id))
    }

    #[instrument(
        skip(self, movement),
        fields(
            product_id = %movement.product_id,
            move_type = %movement.move_type,
            qty = %movement.qty
        ),
        err
    )]
    async fn record_move(&self, movement: &NewMovement) -> Result<Movement, StoreError> {
        if self.rpc_missing.load(Ordering::Relaxed) {
            return self.insert_move(movement).await;
        }

        let request = self
            .client
            .post(self.url("rpc/record_stock_move"))
            .json(&json!({
                "p_product_id": movement.product_id,
                "p_move_type": movement.move_type,
                "p_qty": movement.qty,
                "p_note": movement.note,
            }));

        match self.send_raw("record_move", request).await {
            Ok(body) => decode_single("record_move", body),
            Err(failure) if failure.is_missing_function() => {
                warn!(
                    "record_stock_move function not found; inserting into stock_moves directly, \
                     outbound balance check and insert are not atomic on this store"
                );
                self.rpc_missing.store(true, Ordering::Relaxed);
                self.insert_move(movement).await
            }
            Err(failure) => Err(failure
                .into_store_error("record_move")
                .for_product(movement.product_id)),
        }
    }

    #[instrument(skip(self), err)]
    async fn recent_moves(&self, limit: usize) -> Result<Vec<Movement>, StoreError> {
        let request = self.client.get(self.url("stock_moves")).query(&[
            ("select", MOVE_COLUMNS.to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        self.fetch_rows("recent_moves", request).await
    }

    #[instrument(skip(self), err)]
    async fn list_balances(&self) -> Result<Vec<BalanceRow>, StoreError> {
        let request = self
            .client
            .get(self.url("stock_balance"))
            .query(&[("select", BALANCE_COLUMNS), ("order", "name.asc")]);
        let rows: Vec<BalanceRow> = self.fetch_rows("list_balances", request).await?;
        Ok(rows
            .into_iter()
            .map(|r| BalanceRow {
                balance: r.balance.normalize(),
                ..r
            })
            .collect())
    }
}
