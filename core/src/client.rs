//! Request building and execution for the wallet service.
//!
//! # Design
//! `WalletClient` holds the immutable `WalletConfig` and a `Transport`, and
//! nothing else. Every endpoint has a `build_*` method producing the exact
//! `HttpRequest` as data, and a same-named method that executes it through
//! `request`. Endpoint methods only format a path and optionally a body;
//! they never interpret the answer.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::http::{HttpMethod, HttpRequest};
use crate::response::WalletResponse;
use crate::transport::{Transport, UreqTransport};

/// Path every endpoint lives under.
pub const BASE_PATH: &str = "/v1/wallet";

#[derive(Serialize)]
struct ApproveFeeBody<'a> {
    bills: Vec<&'a str>,
}

#[derive(Serialize)]
struct CancelFeeBody<'a> {
    bill: &'a str,
}

/// Blocking client for the wallet service.
///
/// Shareable across threads when the transport is. Each call is one
/// independent round trip; no retries, no caching.
#[derive(Debug, Clone)]
pub struct WalletClient<T = UreqTransport> {
    config: WalletConfig,
    transport: T,
}

impl WalletClient<UreqTransport> {
    pub fn new(config: WalletConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> WalletClient<T> {
    pub fn with_transport(config: WalletConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute URL for `path` relative to `BASE_PATH` on the configured host.
    ///
    /// The host's own path is replaced, its query kept. Empty and `.`
    /// segments are dropped and `..` climbs one level, so `/a/fee//1` and
    /// `/a/fee/1` address the same resource.
    pub fn full_url(&self, path: &str) -> Result<String, WalletError> {
        let mut url = Url::parse(&self.config.host).map_err(|source| WalletError::InvalidHost {
            host: self.config.host.clone(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(WalletError::InvalidHost {
                host: self.config.host.clone(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        url.set_path(&join_path(BASE_PATH, path));
        Ok(url.into())
    }

    /// Build a request for `path` with the JSON and basic-auth headers every
    /// wallet call carries.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, WalletError> {
        let url = self.full_url(path)?;
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(WalletError::Serialization)?;
        Ok(HttpRequest {
            method,
            url,
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), self.basic_auth()),
            ],
            body,
        })
    }

    /// Send one request and decode the answer.
    ///
    /// Any received response is `Ok`, including non-2xx statuses and bodies
    /// that are not JSON objects (those decode to an empty map).
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<WalletResponse, WalletError> {
        let request = self.build_request(method, path, body)?;
        self.execute(request)
    }

    /// Execute a request built by one of the `build_*` methods.
    pub fn execute(&self, request: HttpRequest) -> Result<WalletResponse, WalletError> {
        debug!(body = request.body.as_deref().unwrap_or(""), "wallet request body");
        let method = request.method;
        let url = request.url.clone();

        let response = self.transport.execute(request).map_err(|e| {
            warn!(%method, %url, error = %e, "wallet request failed");
            WalletError::from(e)
        })?;
        debug!(
            %method,
            %url,
            status = response.status,
            body = %response.body,
            "wallet response"
        );
        Ok(WalletResponse::from_http(response))
    }

    pub fn build_create_address(&self, uid: u64) -> Result<HttpRequest, WalletError> {
        let path = format!("/{}/{uid}/address", self.config.product);
        self.build_request::<()>(HttpMethod::Get, &path, None)
    }

    /// Create (or fetch) the address owned by `uid` in the configured
    /// product. Answers `{account, address, new}`.
    pub fn create_address(&self, uid: u64) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_create_address(uid)?)
    }

    pub fn build_get_balance(&self, address: &str) -> Result<HttpRequest, WalletError> {
        self.build_request::<()>(HttpMethod::Get, &format!("/{address}/balance"), None)
    }

    /// Answers `{balance}`.
    pub fn get_balance(&self, address: &str) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_get_balance(address)?)
    }

    pub fn build_sync_balance(&self, address: &str) -> Result<HttpRequest, WalletError> {
        self.build_request::<()>(HttpMethod::Post, &format!("/{address}/sync_balance"), None)
    }

    /// Answers `{balance, recharge}`.
    pub fn sync_balance(&self, address: &str) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_sync_balance(address)?)
    }

    pub fn build_pay(
        &self,
        address: &str,
        to_address: &str,
        amount: f64,
        fee: f64,
    ) -> Result<HttpRequest, WalletError> {
        let path = format!(
            "/{address}/pay/{to_address}/{}/{}",
            decimal(amount),
            decimal(fee)
        );
        self.build_request::<()>(HttpMethod::Post, &path, None)
    }

    /// Move `amount` to `to_address`, charging `fee`. Answers
    /// `{balance, bill_id}`, or status 600 with `{balance}` when the address
    /// cannot cover it.
    pub fn pay(
        &self,
        address: &str,
        to_address: &str,
        amount: f64,
        fee: f64,
    ) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_pay(address, to_address, amount, fee)?)
    }

    pub fn build_fee(&self, address: &str, fee: f64) -> Result<HttpRequest, WalletError> {
        let path = format!("/{address}/fee//{}", decimal(fee));
        self.build_request::<()>(HttpMethod::Post, &path, None)
    }

    pub fn fee(&self, address: &str, fee: f64) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_fee(address, fee)?)
    }

    pub fn build_advance_fee(&self, address: &str, fee: f64) -> Result<HttpRequest, WalletError> {
        let path = format!("/advance/{address}/fee/{}", decimal(fee));
        self.build_request::<()>(HttpMethod::Post, &path, None)
    }

    /// Debit a fee that stays pending until approved or cancelled by bill id.
    pub fn advance_fee(&self, address: &str, fee: f64) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_advance_fee(address, fee)?)
    }

    pub fn build_approve_advance_fee<S: AsRef<str>>(
        &self,
        bill_ids: &[S],
    ) -> Result<HttpRequest, WalletError> {
        let body = ApproveFeeBody {
            bills: bill_ids.iter().map(|id| id.as_ref()).collect(),
        };
        self.build_request(HttpMethod::Post, "/advance/approve_fee", Some(&body))
    }

    /// Settle pending advance fees in bulk. Answers `{fee_sum, affected}`.
    pub fn approve_advance_fee<S: AsRef<str>>(
        &self,
        bill_ids: &[S],
    ) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_approve_advance_fee(bill_ids)?)
    }

    pub fn build_cancel_advance_fee(&self, bill_id: &str) -> Result<HttpRequest, WalletError> {
        let body = CancelFeeBody { bill: bill_id };
        self.build_request(HttpMethod::Post, "/advance/cancel_fee", Some(&body))
    }

    /// Refund one pending advance fee. Answers `{fee, affected}`.
    pub fn cancel_advance_fee(&self, bill_id: &str) -> Result<WalletResponse, WalletError> {
        self.execute(self.build_cancel_advance_fee(bill_id)?)
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.config.username, self.config.password);
        format!("Basic {}", BASE64_STANDARD.encode(credentials))
    }
}

/// Fixed six-decimal rendering used for every amount in a path.
fn decimal(value: f64) -> String {
    format!("{value:.6}")
}

fn join_path(base: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WalletClient {
        WalletClient::new(WalletConfig::new(
            "http://localhost:3000",
            "game",
            "svc",
            "s3cret",
        ))
    }

    #[test]
    fn join_path_collapses_empty_segments() {
        assert_eq!(join_path(BASE_PATH, "/a/fee//1"), "/v1/wallet/a/fee/1");
        assert_eq!(join_path(BASE_PATH, "advance/approve_fee/"), "/v1/wallet/advance/approve_fee");
        assert_eq!(join_path(BASE_PATH, "/a/./b/../c"), "/v1/wallet/a/c");
        assert_eq!(join_path(BASE_PATH, ""), "/v1/wallet");
    }

    #[test]
    fn full_url_replaces_host_path() {
        let client = WalletClient::new(WalletConfig::new(
            "https://wallet.internal:8443/legacy/?tenant=7",
            "game",
            "svc",
            "s3cret",
        ));
        assert_eq!(
            client.full_url("/abc/balance").unwrap(),
            "https://wallet.internal:8443/v1/wallet/abc/balance?tenant=7"
        );
    }

    #[test]
    fn full_url_rejects_relative_host() {
        let client = WalletClient::new(WalletConfig::new("wallet.internal", "game", "svc", "pw"));
        let err = client.full_url("/abc/balance").unwrap_err();
        assert!(matches!(err, WalletError::InvalidHost { .. }));
    }

    #[test]
    fn full_url_rejects_opaque_host() {
        let client = WalletClient::new(WalletConfig::new("mailto:ops", "game", "svc", "pw"));
        assert!(matches!(
            client.full_url("/abc/balance"),
            Err(WalletError::InvalidHost { .. })
        ));
    }

    #[test]
    fn build_request_sets_json_and_basic_auth() {
        let req = client().build_get_balance("abc").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/abc/balance");
        assert_eq!(req.header("content-type"), Some("application/json"));
        // base64("svc:s3cret")
        assert_eq!(req.header("authorization"), Some("Basic c3ZjOnMzY3JldA=="));
        assert!(req.body.is_none());
    }

    #[test]
    fn create_address_uses_product_namespace() {
        let req = client().build_create_address(42).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/game/42/address");
    }

    #[test]
    fn sync_balance_is_a_post_without_body() {
        let req = client().build_sync_balance("abc").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/abc/sync_balance");
        assert!(req.body.is_none());
    }

    #[test]
    fn pay_formats_amounts_with_six_decimals() {
        let req = client().build_pay("abc", "xyz", 1.5, 0.01).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "http://localhost:3000/v1/wallet/abc/pay/xyz/1.500000/0.010000"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn fee_path_is_normalized() {
        let req = client().build_fee("abc", 0.1).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/abc/fee/0.100000");
    }

    #[test]
    fn advance_fee_lives_under_advance() {
        let req = client().build_advance_fee("abc", 0.25).unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/advance/abc/fee/0.250000");
    }

    #[test]
    fn approve_advance_fee_sends_bill_list() {
        let req = client().build_approve_advance_fee(&["52", "53"]).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/advance/approve_fee");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"bills": ["52", "53"]}));
    }

    #[test]
    fn cancel_advance_fee_sends_single_bill() {
        let req = client().build_cancel_advance_fee("54").unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/advance/cancel_fee");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"bill": "54"}));
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let req = client().build_get_balance("a b").unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/wallet/a%20b/balance");
    }
}
