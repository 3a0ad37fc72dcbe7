//! Blocking client for the remote wallet/ledger service.
//!
//! # Overview
//! `WalletClient` authenticates with HTTP basic credentials, formats the URL
//! of each wallet endpoint (address creation, balances, payments, fees and
//! advance fees), sends JSON bodies where the endpoint takes one, and returns
//! the observed status code together with the decoded JSON body.
//!
//! # Design
//! - `WalletClient` holds only its `WalletConfig` and a `Transport`; no
//!   sessions, caches or retries.
//! - Every endpoint has a `build_*` method returning the request as data, so
//!   the I/O boundary stays explicit and testable.
//! - `Transport` is the one I/O seam. `UreqTransport` is the default; tests
//!   inject their own.
//! - Non-2xx statuses (including the service's `600` for insufficient
//!   balance) are ordinary responses. Only failures that leave no response
//!   at all are errors.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;

pub use client::{WalletClient, BASE_PATH};
pub use config::WalletConfig;
pub use error::{TransportError, WalletError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{
    AddressInfo, ApprovedFees, Balance, CancelledFee, FeeReceipt, PaymentReceipt, SyncedBalance,
    WalletResponse, INSUFFICIENT_BALANCE,
};
pub use transport::{Transport, UreqTransport};
