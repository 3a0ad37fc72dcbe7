//! Connection settings for the wallet service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host, product namespace and basic-auth credentials of the wallet service.
///
/// Keys match the service's configuration files (`host`, `product`,
/// `username`, `password`), so it can be deserialized from whatever format
/// the embedding application uses. Nothing is validated here; a bad host
/// surfaces on the first request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub host: String,
    pub product: String,
    pub username: String,
    pub password: String,
}

impl WalletConfig {
    pub fn new(
        host: impl Into<String>,
        product: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            product: product.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("host", &self.host)
            .field("product", &self.product)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
