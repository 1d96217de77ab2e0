//! Raw transaction relay via `POST /tx`.

use heirvault_plan::Network;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ExplorerClient;
use crate::provider::{explorer_tx_url, Provider};
use crate::ExplorerError;

/// Shortest hex accepted: 60 bytes, below any plausible signed transaction
pub const MIN_TX_HEX_LEN: usize = 120;

/// A relayed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub txid: String,
    pub provider_used: Provider,
    pub used_fallback_provider: bool,
    pub explorer_tx_url: String,
}

/// Normalize user-pasted transaction hex.
///
/// Trims and lowercases, then requires non-empty, hex-only, even-length
/// input of at least [`MIN_TX_HEX_LEN`] characters.
pub fn sanitize_tx_hex(raw: &str) -> Result<String, ExplorerError> {
    let hex = raw.trim().to_ascii_lowercase();
    if hex.is_empty() {
        return Err(ExplorerError::InvalidTxHex("nothing was entered".into()));
    }
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ExplorerError::InvalidTxHex(format!(
            "'{}' is not a hex digit",
            bad
        )));
    }
    if hex.len() % 2 != 0 {
        return Err(ExplorerError::InvalidTxHex(
            "odd number of hex digits; a character is missing".into(),
        ));
    }
    if hex.len() < MIN_TX_HEX_LEN {
        return Err(ExplorerError::InvalidTxHex(format!(
            "{} hex characters is too short for a signed transaction (minimum {})",
            hex.len(),
            MIN_TX_HEX_LEN
        )));
    }
    Ok(hex)
}

/// A relay answer must be exactly one txid
fn parse_txid(body: &str) -> Result<String, ExplorerError> {
    let txid = body.trim();
    if txid.len() != 64 || !txid.chars().all(|c| c.is_ascii_hexdigit()) {
        let preview: String = txid.chars().take(80).collect();
        return Err(ExplorerError::InvalidRelayResponse(preview));
    }
    Ok(txid.to_ascii_lowercase())
}

impl ExplorerClient {
    /// Relay a signed transaction through `provider`, or (if `fallback`)
    /// the other one. Input is checked before any network call.
    pub async fn broadcast(
        &self,
        network: Network,
        raw_tx_hex: &str,
        provider: Provider,
        fallback: bool,
        cancel: &CancellationToken,
    ) -> Result<BroadcastResult, ExplorerError> {
        let tx_hex = sanitize_tx_hex(raw_tx_hex)?;
        self.api_base(provider, network)?;

        let (txid, used, fell_back) = self
            .with_fallback(provider, fallback, |p| {
                self.broadcast_to(network, &tx_hex, p, cancel)
            })
            .await?;

        log::info!("Broadcast {} via {}", txid, used);
        Ok(BroadcastResult {
            explorer_tx_url: explorer_tx_url(network, used, &txid)?,
            txid,
            provider_used: used,
            used_fallback_provider: fell_back,
        })
    }

    async fn broadcast_to(
        &self,
        network: Network,
        tx_hex: &str,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<String, ExplorerError> {
        let base = self.api_base(provider, network)?;
        let body = self
            .post_text(provider, &format!("{}/tx", base), tx_hex.to_string(), cancel)
            .await?;
        parse_txid(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_hex(len: usize) -> String {
        "ab".repeat(len / 2)
    }

    #[test]
    fn test_sanitize_normalizes() {
        let raw = format!("  {}\n", tx_hex(120).to_uppercase());
        assert_eq!(sanitize_tx_hex(&raw).unwrap(), tx_hex(120));
    }

    #[test]
    fn test_sanitize_rejects() {
        assert!(matches!(
            sanitize_tx_hex("   "),
            Err(ExplorerError::InvalidTxHex(_))
        ));
        assert!(sanitize_tx_hex(&format!("{}zz", tx_hex(120))).is_err());
        assert!(sanitize_tx_hex(&format!("{}a", tx_hex(120))).is_err());
        assert!(sanitize_tx_hex(&tx_hex(118)).is_err());
    }

    #[test]
    fn test_parse_txid() {
        let txid = "A".repeat(64);
        assert_eq!(parse_txid(&format!("{}\n", txid)).unwrap(), "a".repeat(64));
        assert!(matches!(
            parse_txid("sendrawtransaction RPC error: bad-txns-inputs-missingorspent"),
            Err(ExplorerError::InvalidRelayResponse(_))
        ));
        assert!(parse_txid(&"a".repeat(63)).is_err());
    }
}
