//! REST client for the brokerage gateway

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, Response};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use url::Url;

use super::auth::generate_auth_headers;
use super::messages::*;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::Broker;
use crate::common::types::{OrderAck, OrderRequest, Quote, Tick};
use crate::config::types::{ApiCredentials, BrokerConfig};

/// Session established by a successful login
#[derive(Debug, Clone)]
struct BrokerSession {
    token: String,
    account_id: Option<String>,
}

/// REST client for the brokerage gateway
#[derive(Debug)]
pub struct BrokerRestClient {
    /// HTTP client
    client: Client,
    /// Base URL of the gateway
    base_url: String,
    /// Credentials used for login and order signing
    credentials: Option<ApiCredentials>,
    /// Route orders to the simulation environment
    simulation: bool,
    /// Token and account bound at login
    session: RwLock<Option<BrokerSession>>,
}

impl BrokerRestClient {
    /// Create a new client (not logged in)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid broker url '{}': {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            credentials: None,
            simulation: true,
            session: RwLock::new(None),
        })
    }

    /// Build a client from configuration
    pub fn from_config(config: &BrokerConfig) -> Result<Self> {
        let client = Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.request_timeout_seconds),
        )?
        .with_simulation(config.simulation);

        Ok(match config.credentials() {
            Some(credentials) => client.with_credentials(credentials),
            None => client,
        })
    }

    /// Set API credentials
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn url_with_params(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&self.url(path), params)
            .map_err(|e| ClientError::Internal(format!("invalid url for {}: {}", path, e)))
    }

    async fn current_session(&self) -> Result<BrokerSession> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::Authentication("not logged in".to_string()))
    }

    /// Whether login has succeeded
    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Account bound at login, if the gateway reported one
    pub async fn account_id(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.account_id.clone())
    }

    /// Log in and bind the futures account
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<()> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ClientError::Authentication("missing api key or secret".to_string()))?;

        let request = LoginRequest {
            api_key: credentials.api_key.clone(),
            secret_key: credentials.secret_key.clone(),
            simulation: self.simulation,
        };

        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Authentication(format!(
                "login returned status {}: {}",
                status, body
            )));
        }

        let login: LoginResponse = response.json().await?;
        info!(
            simulation = self.simulation,
            account = login.account_id.as_deref().unwrap_or("-"),
            "Logged in to brokerage"
        );

        *self.session.write().await = Some(BrokerSession {
            token: login.token,
            account_id: login.account_id,
        });
        Ok(())
    }

    /// Map non-success statuses to errors
    async fn check_status(response: Response, context: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                ClientError::Authentication(format!("{} returned status {}: {}", context, status, body))
            }
            _ => ClientError::InvalidResponse(format!(
                "{} returned status {}: {}",
                context, status, body
            )),
        })
    }
}

#[async_trait]
impl Broker for BrokerRestClient {
    #[instrument(skip(self))]
    async fn ticks(&self, contract: &str, date: NaiveDate) -> Result<Vec<Tick>> {
        let session = self.current_session().await?;
        let date = date.format("%Y-%m-%d").to_string();
        let url = self.url_with_params("/ticks", &[("contract", contract), ("date", date.as_str())])?;
        debug!("Fetching ticks from: {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check_status(response, "ticks").await?;

        let ticks: TicksResponse = response.json().await?;
        ticks.into_ticks()
    }

    #[instrument(skip(self))]
    async fn snapshot(&self, contract: &str) -> Result<Quote> {
        let session = self.current_session().await?;
        let url = self.url_with_params("/snapshots", &[("contract", contract)])?;
        debug!("Fetching snapshot from: {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&session.token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::ContractNotFound(contract.to_string()));
        }
        let response = Self::check_status(response, "snapshots").await?;

        let snapshots: Vec<SnapshotResponse> = response.json().await?;
        snapshots
            .into_iter()
            .next()
            .map(Quote::from)
            .ok_or_else(|| ClientError::ContractNotFound(contract.to_string()))
    }

    #[instrument(skip(self), fields(contract = %order.contract, action = %order.action))]
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let session = self.current_session().await?;
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ClientError::Authentication("missing api key or secret".to_string()))?;

        let payload = OrderPayload {
            account_id: session.account_id.clone(),
            contract: order.contract.clone(),
            action: order.action,
            quantity: order.quantity,
            price_type: order.price_type,
            order_type: "IOC".to_string(),
        };
        let body = serde_json::to_string(&payload)?;
        let auth = generate_auth_headers(
            &credentials.api_key,
            &credentials.secret_key,
            "POST",
            "/orders",
            &body,
        )?;

        let request = self
            .client
            .post(self.url("/orders"))
            .bearer_auth(&session.token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = auth.apply_to_request(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.message.or(e.error))
                .unwrap_or(text);
            return Err(ClientError::OrderRejected(format!(
                "status {}: {}",
                status, detail
            )));
        }

        let order_response: OrderResponse = response.json().await?;
        if order_response.is_rejected() {
            return Err(ClientError::OrderRejected(
                order_response
                    .msg
                    .unwrap_or_else(|| order_response.status.clone()),
            ));
        }

        info!(order_id = ?order_response.order_id, status = %order_response.status, "Order accepted");
        Ok(OrderAck {
            order_id: order_response.order_id.unwrap_or_default(),
            status: order_response.status,
        })
    }
}
