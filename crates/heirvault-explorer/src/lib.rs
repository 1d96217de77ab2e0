//! HeirVault Explorer Client
//!
//! Read-only chain access over public Esplora REST APIs (mempool.space,
//! blockstream.info) for:
//! - Vault balance and funding history (timelock tracking)
//! - Chain tip height (confirmation counting)
//! - Transaction broadcasting (check-ins and beneficiary claims)
//!
//! Every request is bounded by a timeout and can be cancelled. A failed
//! provider may be retried once on the other provider; providers are never
//! queried in parallel.
//!
//! # Example
//!
//! ```ignore
//! use heirvault_explorer::{ExplorerClient, ExplorerConfig, Provider};
//! use heirvault_plan::Network;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ExplorerClient::new(ExplorerConfig::default());
//! let summary = client
//!     .fetch_address_summary(Network::Mainnet, "bc1q...", Provider::Mempool, true, &CancellationToken::new())
//!     .await?;
//! println!("Balance: {} sats", summary.total_balance_sats);
//! ```

pub mod broadcast;
pub mod client;
pub mod esplora;
pub mod provider;
pub mod summary;

pub use broadcast::{sanitize_tx_hex, BroadcastResult, MIN_TX_HEX_LEN};
pub use client::{ApiOverride, ExplorerClient, ExplorerConfig, DEFAULT_TIMEOUT_SECS};
pub use provider::{explorer_address_url, explorer_tx_url, Provider};
pub use summary::{AddressSummary, FundingEvent, MAX_PAGES, PAGE_SIZE};

pub use tokio_util::sync::CancellationToken;

use heirvault_plan::Network;
use thiserror::Error;

/// Errors from explorer operations
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("No public explorer serves {0}. Use mainnet or testnet, or query your own node")]
    NetworkUnsupported(Network),

    #[error("Unknown explorer provider '{0}'. Use one of: mempool, blockstream")]
    UnknownProvider(String),

    #[error(
        "The custom {provider} API is configured for {configured}, not {requested}. \
         Point it at a {requested} instance or remove the override"
    )]
    OverrideNetworkMismatch {
        provider: Provider,
        configured: Network,
        requested: Network,
    },

    #[error("{provider} did not answer within {secs} seconds")]
    RequestTimeout { provider: Provider, secs: u64 },

    #[error("{provider} request failed: {message}")]
    ProviderError { provider: Provider, message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("All explorer providers failed; last error: {last}")]
    AllProvidersFailed { last: Box<ExplorerError> },

    #[error("Invalid address '{0}': expected a bech32 address such as tb1q... or bc1p...")]
    InvalidAddress(String),

    #[error(
        "Invalid raw transaction: {0}. Paste the fully signed transaction as hex, \
         e.g. the output of your wallet's \"export raw transaction\""
    )]
    InvalidTxHex(String),

    #[error("Relay answered with something other than a txid: {0}")]
    InvalidRelayResponse(String),
}
