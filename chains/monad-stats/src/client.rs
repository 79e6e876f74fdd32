//! LayerHub statistics client.
//!
//! One GET per attempt, routed through the proxy the pipeline hands in.
//! HTTP clients are cached per proxy so retries on a reused reserve proxy
//! keep their connections.

use async_trait::async_trait;
use core_logic::{FetchResult, Fetcher, NetworkError, Proxy, Wallet};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const CHAIN: &str = "monad_testnet";
pub const RSC_PARAM: &str = "1bw6b";
pub const NOT_FOUND_MESSAGE: &str = "Wallet is not found for chain_id: monad_testnet";

const BROWSER_HEADERS: [(&str, &str); 9] = [
    ("accept", "*/*"),
    ("accept-language", "ru,en-US;q=0.9,en;q=0.8"),
    ("content-type", "application/json"),
    (
        "sec-ch-ua",
        "\"Not A(Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Linux\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
];

pub struct LayerHubClient {
    base_url: String,
    timeout: Duration,
    /// Cache of HTTP clients per proxy endpoint + credentials
    http_clients: RwLock<HashMap<Proxy, Client>>,
}

impl LayerHubClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http_clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn wallet_url(&self, wallet: &Wallet) -> String {
        format!(
            "{}/be-api/wallets/{}/{}",
            self.base_url,
            CHAIN,
            wallet.as_str()
        )
    }

    async fn client_for(&self, proxy: &Proxy) -> Result<Client, NetworkError> {
        if let Some(client) = self.http_clients.read().await.get(proxy) {
            return Ok(client.clone());
        }

        let proxy_err = |reason: String| NetworkError::ProxyFailure {
            proxy: proxy.to_string(),
            reason,
        };

        // socks credentials travel in the URL, http ones as Proxy-Authorization
        let reqwest_proxy = if proxy.is_socks() {
            reqwest::Proxy::all(proxy.url().as_str())
        } else {
            reqwest::Proxy::all(proxy.endpoint()).map(|p| match proxy.credentials() {
                Some((username, password)) => p.basic_auth(&username, &password),
                None => p,
            })
        }
        .map_err(|e| proxy_err(e.to_string()))?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .default_headers(browser_headers())
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| proxy_err(e.to_string()))?;

        let mut cache = self.http_clients.write().await;
        Ok(cache.entry(proxy.clone()).or_insert(client).clone())
    }

    async fn request(&self, wallet: &Wallet, proxy: &Proxy) -> FetchResult {
        let client = match self.client_for(proxy).await {
            Ok(client) => client,
            Err(e) => return FetchResult::Transient(e),
        };

        let url = self.wallet_url(wallet);
        let response = match client.get(&url).query(&[("_rsc", RSC_PARAM)]).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::Transient(transport_error(&e, proxy, &url, self.timeout))
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::Transient(transport_error(&e, proxy, &url, self.timeout))
            }
        };

        debug!("{} via {} -> {} ({} bytes)", wallet, proxy, status, body.len());
        classify(wallet, status.as_u16(), &body, &url)
    }
}

#[async_trait]
impl Fetcher for LayerHubClient {
    async fn fetch(
        &self,
        wallet: &Wallet,
        proxy: &Proxy,
        cancel: &CancellationToken,
    ) -> FetchResult {
        tokio::select! {
            _ = cancel.cancelled() => FetchResult::Transient(NetworkError::Cancelled),
            result = self.request(wallet, proxy) => result,
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

fn transport_error(
    e: &reqwest::Error,
    proxy: &Proxy,
    url: &str,
    timeout: Duration,
) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
            endpoint: url.to_string(),
        }
    } else if e.is_connect() {
        // the proxy is the only peer the client dials
        NetworkError::ProxyFailure {
            proxy: proxy.to_string(),
            reason: e.to_string(),
        }
    } else {
        NetworkError::Request {
            endpoint: url.to_string(),
            reason: format!("{} (via proxy {})", e, proxy),
        }
    }
}

/// Maps one HTTP exchange to a fetch result.
pub fn classify(wallet: &Wallet, status: u16, body: &str, endpoint: &str) -> FetchResult {
    if !(200..300).contains(&status) {
        return FetchResult::Transient(NetworkError::HttpError {
            status_code: status,
            body: body.to_string(),
        });
    }

    if body.is_empty() {
        return FetchResult::Transient(NetworkError::EmptyBody {
            endpoint: endpoint.to_string(),
        });
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut object)) => {
            if object.get("message").and_then(Value::as_str) == Some(NOT_FOUND_MESSAGE) {
                return FetchResult::NotFound;
            }
            object.insert("wallet_address".to_string(), json!(wallet.as_str()));
            FetchResult::Success(Value::Object(object))
        }
        Ok(other) => FetchResult::Success(wrap(wallet, other)),
        Err(_) => FetchResult::Success(wrap(wallet, Value::String(body.to_string()))),
    }
}

fn wrap(wallet: &Wallet, response: Value) -> Value {
    let mut object = Map::new();
    object.insert("wallet_address".to_string(), json!(wallet.as_str()));
    object.insert("response".to_string(), response);
    Value::Object(object)
}
