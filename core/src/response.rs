//! Decoded wallet responses.
//!
//! # Design
//! Every endpoint answers with a loosely specified JSON object, so the
//! primary result is a generic `WalletResponse`: the observed status plus the
//! body as a JSON map. A body that is missing, malformed or not an object
//! decodes to an empty map instead of an error, letting callers tell "the
//! server answered" apart from "the answer was usable".
//!
//! The typed views below describe what the service documents for each
//! endpoint. They are opt-in: call `WalletResponse::parse` with the one that
//! matches the endpoint and status you got.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::WalletError;
use crate::http::HttpResponse;

/// Status the wallet service uses on `pay`, `fee` and `advance_fee` when the
/// address cannot cover the amount.
pub const INSUFFICIENT_BALANCE: u16 = 600;

/// Status code and JSON body of one wallet call.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletResponse {
    pub status: u16,
    pub body: Map<String, Value>,
}

impl WalletResponse {
    pub fn from_http(response: HttpResponse) -> Self {
        let body = match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            status: response.status,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_insufficient_balance(&self) -> bool {
        self.status == INSUFFICIENT_BALANCE
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Deserialize the body into one of the typed views (or any other type).
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, WalletError> {
        serde_json::from_value(Value::Object(self.body.clone())).map_err(WalletError::Decode)
    }
}

/// `create_address` on 200.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressInfo {
    pub account: String,
    pub address: String,
    /// `false` when the uid already owned an address.
    pub new: bool,
}

/// `get_balance`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Balance {
    pub balance: f64,
}

/// `sync_balance`: the refreshed balance and how much was credited.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncedBalance {
    pub balance: f64,
    pub recharge: f64,
}

/// `pay`. `bill_id` is absent on an insufficient-balance answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentReceipt {
    pub balance: f64,
    #[serde(default)]
    pub bill_id: Option<String>,
}

/// `fee` and `advance_fee`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeeReceipt {
    pub balance: f64,
    #[serde(default)]
    pub bill_id: Option<String>,
}

/// `approve_advance_fee`: total settled and number of bills approved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApprovedFees {
    pub fee_sum: f64,
    pub affected: i64,
}

/// `cancel_advance_fee`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CancelledFee {
    pub fee: f64,
    pub affected: i64,
}
