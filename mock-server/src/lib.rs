//! In-memory stand-in for the remote wallet service.
//!
//! Serves the wallet endpoints under `/v1/wallet` behind HTTP basic auth and
//! keeps a small ledger: addresses per product/uid, balances, pending
//! recharges and bills. Amounts are kept in micro-units so balances come out
//! exact to six decimals, the precision the client puts on the wire.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Status the service answers with when an address cannot cover a debit.
pub const INSUFFICIENT_BALANCE: u16 = 600;

const MICROS: f64 = 1_000_000.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches_header(&self, value: &str) -> bool {
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
            return false;
        };
        decoded == format!("{}:{}", self.username, self.password).as_bytes()
    }
}

#[derive(Clone, Debug)]
struct Account {
    balance: i64,
    pending_recharge: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BillKind {
    Payment,
    Fee,
    AdvanceFee,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BillStatus {
    Settled,
    Pending,
    Cancelled,
}

#[derive(Clone, Debug)]
struct Bill {
    address: String,
    kind: BillKind,
    amount: i64,
    status: BillStatus,
}

#[derive(Default, Debug)]
pub struct Ledger {
    owners: HashMap<(String, u64), String>,
    accounts: HashMap<String, Account>,
    bills: HashMap<String, Bill>,
    next_bill: u64,
}

impl Ledger {
    fn record_bill(&mut self, address: &str, kind: BillKind, amount: i64, status: BillStatus) -> String {
        self.next_bill += 1;
        let id = self.next_bill.to_string();
        self.bills.insert(
            id.clone(),
            Bill {
                address: address.to_string(),
                kind,
                amount,
                status,
            },
        );
        id
    }

    fn balance_of(&self, address: &str) -> Option<i64> {
        self.accounts.get(address).map(|account| account.balance)
    }
}

pub type Db = Arc<RwLock<Ledger>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    credentials: Arc<Credentials>,
}

#[derive(Deserialize)]
pub struct ApproveFee {
    pub bills: Vec<String>,
}

#[derive(Deserialize)]
pub struct CancelFee {
    pub bill: String,
}

pub fn app(credentials: Credentials) -> Router {
    app_with_ledger(credentials, Db::default())
}

/// Same as `app`, but over a caller-held ledger.
pub fn app_with_ledger(credentials: Credentials, db: Db) -> Router {
    let state = AppState {
        db,
        credentials: Arc::new(credentials),
    };
    // Every route shares the `{address}` capture for its first segment; on
    // the address route it carries the product.
    let wallet = Router::new()
        .route("/{address}/{uid}/address", get(create_address))
        .route("/{address}/balance", get(get_balance))
        .route("/{address}/sync_balance", post(sync_balance))
        .route("/{address}/deposit/{amount}", post(deposit))
        .route("/{address}/pay/{to_address}/{amount}/{fee}", post(pay))
        .route("/{address}/fee/{fee}", post(fee))
        .route("/advance/{address}/fee/{fee}", post(advance_fee))
        .route("/advance/approve_fee", post(approve_advance_fee))
        .route("/advance/cancel_fee", post(cancel_advance_fee))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .with_state(state);
    Router::new().nest("/v1/wallet", wallet)
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app(credentials)).await
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| state.credentials.matches_header(value));
    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejected unauthenticated wallet request");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"wallet\"")],
        )
            .into_response();
    }
    next.run(request).await
}

fn to_micros(value: f64) -> Option<i64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * MICROS).round() as i64)
}

fn to_units(micros: i64) -> f64 {
    micros as f64 / MICROS
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn unknown_address() -> Response {
    error(StatusCode::NOT_FOUND, "unknown address")
}

fn invalid_amount() -> Response {
    error(StatusCode::BAD_REQUEST, "invalid amount")
}

fn insufficient_balance(balance: i64) -> Response {
    let status = StatusCode::from_u16(INSUFFICIENT_BALANCE).unwrap_or(StatusCode::PAYMENT_REQUIRED);
    (status, Json(json!({ "balance": to_units(balance) }))).into_response()
}

async fn create_address(State(state): State<AppState>, Path((product, uid)): Path<(String, u64)>) -> Response {
    let mut ledger = state.db.write().await;
    let key = (product.clone(), uid);
    if let Some(address) = ledger.owners.get(&key) {
        return Json(json!({
            "account": format!("{product}_{uid}"),
            "address": address,
            "new": false,
        }))
        .into_response();
    }

    let address = format!("q{}w", Uuid::new_v4().simple());
    ledger.owners.insert(key, address.clone());
    ledger.accounts.insert(
        address.clone(),
        Account {
            balance: 0,
            pending_recharge: 0,
        },
    );
    tracing::debug!(%product, uid, %address, "created wallet address");
    Json(json!({
        "account": format!("{product}_{uid}"),
        "address": address,
        "new": true,
    }))
    .into_response()
}

async fn get_balance(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let ledger = state.db.read().await;
    match ledger.balance_of(&address) {
        Some(balance) => Json(json!({ "balance": to_units(balance) })).into_response(),
        None => unknown_address(),
    }
}

async fn sync_balance(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let mut ledger = state.db.write().await;
    let Some(account) = ledger.accounts.get_mut(&address) else {
        return unknown_address();
    };
    let recharge = std::mem::take(&mut account.pending_recharge);
    account.balance += recharge;
    tracing::debug!(%address, recharge, "synced balance");
    Json(json!({
        "balance": to_units(account.balance),
        "recharge": to_units(recharge),
    }))
    .into_response()
}

/// Stages an incoming transfer; it reaches the balance on the next sync.
async fn deposit(State(state): State<AppState>, Path((address, amount)): Path<(String, f64)>) -> Response {
    let Some(amount) = to_micros(amount) else {
        return invalid_amount();
    };
    let mut ledger = state.db.write().await;
    let Some(account) = ledger.accounts.get_mut(&address) else {
        return unknown_address();
    };
    account.pending_recharge += amount;
    Json(json!({ "pending": to_units(account.pending_recharge) })).into_response()
}

async fn pay(
    State(state): State<AppState>,
    Path((address, to_address, amount, fee)): Path<(String, String, f64, f64)>,
) -> Response {
    let (Some(amount), Some(fee)) = (to_micros(amount), to_micros(fee)) else {
        return invalid_amount();
    };
    let mut ledger = state.db.write().await;
    if !ledger.accounts.contains_key(&to_address) {
        return unknown_address();
    }
    let Some(balance) = ledger.balance_of(&address) else {
        return unknown_address();
    };
    if balance < amount + fee {
        return insufficient_balance(balance);
    }

    if let Some(account) = ledger.accounts.get_mut(&address) {
        account.balance -= amount + fee;
    }
    if let Some(account) = ledger.accounts.get_mut(&to_address) {
        account.balance += amount;
    }
    let bill_id = ledger.record_bill(&address, BillKind::Payment, amount + fee, BillStatus::Settled);
    tracing::debug!(%address, %to_address, amount, fee, %bill_id, "payment settled");
    Json(json!({
        "balance": ledger.balance_of(&address).map(to_units),
        "bill_id": bill_id,
    }))
    .into_response()
}

async fn debit_fee(state: AppState, address: String, fee: f64, kind: BillKind, status: BillStatus) -> Response {
    let Some(fee) = to_micros(fee) else {
        return invalid_amount();
    };
    let mut ledger = state.db.write().await;
    let Some(account) = ledger.accounts.get_mut(&address) else {
        return unknown_address();
    };
    if account.balance < fee {
        return insufficient_balance(account.balance);
    }
    account.balance -= fee;
    let balance = account.balance;
    let bill_id = ledger.record_bill(&address, kind, fee, status);
    tracing::debug!(%address, fee, ?kind, %bill_id, "fee debited");
    Json(json!({ "balance": to_units(balance), "bill_id": bill_id })).into_response()
}

async fn fee(State(state): State<AppState>, Path((address, fee)): Path<(String, f64)>) -> Response {
    debit_fee(state, address, fee, BillKind::Fee, BillStatus::Settled).await
}

async fn advance_fee(State(state): State<AppState>, Path((address, fee)): Path<(String, f64)>) -> Response {
    debit_fee(state, address, fee, BillKind::AdvanceFee, BillStatus::Pending).await
}

/// Settles every listed bill that is a pending advance fee; others are
/// skipped and do not count toward `affected`.
async fn approve_advance_fee(State(state): State<AppState>, Json(input): Json<ApproveFee>) -> Response {
    let mut ledger = state.db.write().await;
    let mut fee_sum = 0;
    let mut affected = 0;
    for id in &input.bills {
        if let Some(bill) = ledger.bills.get_mut(id) {
            if bill.kind == BillKind::AdvanceFee && bill.status == BillStatus::Pending {
                bill.status = BillStatus::Settled;
                fee_sum += bill.amount;
                affected += 1;
            }
        }
    }
    tracing::debug!(affected, fee_sum, "approved advance fees");
    Json(json!({ "fee_sum": to_units(fee_sum), "affected": affected })).into_response()
}

/// Refunds a pending advance fee to the address it was debited from.
async fn cancel_advance_fee(State(state): State<AppState>, Json(input): Json<CancelFee>) -> Response {
    let mut ledger = state.db.write().await;
    let refund = match ledger.bills.get_mut(&input.bill) {
        Some(bill) if bill.kind == BillKind::AdvanceFee && bill.status == BillStatus::Pending => {
            bill.status = BillStatus::Cancelled;
            Some((bill.address.clone(), bill.amount))
        }
        _ => None,
    };
    let Some((address, amount)) = refund else {
        return Json(json!({ "fee": 0.0, "affected": 0 })).into_response();
    };
    if let Some(account) = ledger.accounts.get_mut(&address) {
        account.balance += amount;
    }
    tracing::debug!(bill = %input.bill, %address, amount, "cancelled advance fee");
    Json(json!({ "fee": to_units(amount), "affected": 1 })).into_response()
}
