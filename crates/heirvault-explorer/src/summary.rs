//! Vault status: balances, latest funding, confirmations.
//!
//! The address endpoints give aggregate stats plus a newest-first page of
//! transactions (mempool first, then up to [`PAGE_SIZE`] confirmed). The
//! latest funding and latest *confirmed* funding are usually on that page;
//! when they are not, older confirmed history is paged with
//! `/txs/chain/{last_seen_txid}`.

use chrono::{DateTime, Utc};
use heirvault_plan::Network;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ExplorerClient;
use crate::esplora::{AddressStats, EsploraTx};
use crate::provider::Provider;
use crate::ExplorerError;

/// Confirmed transactions per Esplora page
pub const PAGE_SIZE: usize = 25;

/// Upper bound on pages read per query, first page included
pub const MAX_PAGES: usize = 10;

/// Outputs of one transaction paying the watched address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingEvent {
    pub txid: String,
    pub funded_amount_sats: u64,
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    /// `tip - block_height + 1` when both are known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u32>,
}

/// Snapshot of an address, created fresh per query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub address: String,
    pub confirmed_balance_sats: i64,
    /// Negative while a spend of confirmed coins sits in the mempool
    pub unconfirmed_balance_sats: i64,
    pub total_balance_sats: i64,
    pub tx_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_funding_tx: Option<FundingEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_confirmed_funding_tx: Option<FundingEvent>,
    pub provider_used: Provider,
    pub used_fallback_provider: bool,
    pub fetched_at: DateTime<Utc>,
}

impl AddressSummary {
    /// Confirmations of the newest confirmed deposit: the input to check-in
    /// planning.
    pub fn confirmations_since_last_funding(&self) -> Option<u32> {
        self.last_confirmed_funding_tx
            .as_ref()
            .and_then(|f| f.confirmations)
    }
}

/// Reject anything that is not plausibly an address before it lands in a URL
pub fn validate_address(address: &str) -> Result<&str, ExplorerError> {
    let trimmed = address.trim();
    if trimmed.len() < 14
        || trimmed.len() > 90
        || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ExplorerError::InvalidAddress(address.to_string()));
    }
    Ok(trimmed)
}

fn funding_event(tx: &EsploraTx, address: &str, tip: Option<u32>) -> Option<FundingEvent> {
    let funded = tx.funded_to(address);
    if funded == 0 {
        return None;
    }
    let block_height = tx.status.block_height.filter(|_| tx.status.confirmed);
    let confirmations = match (tip, block_height) {
        (Some(tip), Some(height)) if tip >= height => Some(tip - height + 1),
        _ => None,
    };
    Some(FundingEvent {
        txid: tx.txid.clone(),
        funded_amount_sats: funded,
        confirmed: tx.status.confirmed,
        block_height,
        block_time: tx.status.block_time.filter(|_| tx.status.confirmed),
        confirmations,
    })
}

/// Newest funding and newest confirmed funding seen so far
#[derive(Default)]
struct FundingScan {
    latest: Option<FundingEvent>,
    latest_confirmed: Option<FundingEvent>,
}

impl FundingScan {
    fn complete(&self) -> bool {
        self.latest.is_some() && self.latest_confirmed.is_some()
    }

    /// `page` is newest-first, so the first hit of each kind wins
    fn scan(&mut self, page: &[EsploraTx], address: &str, tip: Option<u32>) {
        for tx in page {
            if self.complete() {
                return;
            }
            let Some(event) = funding_event(tx, address, tip) else {
                continue;
            };
            if event.confirmed && self.latest_confirmed.is_none() {
                self.latest_confirmed = Some(event.clone());
            }
            if self.latest.is_none() {
                self.latest = Some(event);
            }
        }
    }
}

impl ExplorerClient {
    /// Balances, latest funding events and confirmation counts for an
    /// address, from `provider` or (if `fallback`) the other one.
    pub async fn fetch_address_summary(
        &self,
        network: Network,
        address: &str,
        provider: Provider,
        fallback: bool,
        cancel: &CancellationToken,
    ) -> Result<AddressSummary, ExplorerError> {
        let address = validate_address(address)?;
        // Regtest and mismatched overrides fail before any request
        self.api_base(provider, network)?;

        let (mut summary, used, fell_back) = self
            .with_fallback(provider, fallback, |p| {
                self.summary_from(network, address, p, cancel)
            })
            .await?;
        summary.provider_used = used;
        summary.used_fallback_provider = fell_back;
        Ok(summary)
    }

    async fn summary_from(
        &self,
        network: Network,
        address: &str,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<AddressSummary, ExplorerError> {
        let base = self.api_base(provider, network)?;
        log::debug!("Fetching {} from {}", address, provider);

        let stats: AddressStats = self
            .get_json(provider, &format!("{}/address/{}", base, address), cancel)
            .await?;
        let first_page: Vec<EsploraTx> = self
            .get_json(provider, &format!("{}/address/{}/txs", base, address), cancel)
            .await?;
        let tip = self.tip_height(provider, &base, cancel).await?;

        let mut scan = FundingScan::default();
        scan.scan(&first_page, address, tip);

        let mut page = first_page;
        let mut pages = 1;
        let mut cursor: Option<String> = None;
        while !scan.complete() {
            let confirmed: Vec<&EsploraTx> = page.iter().filter(|t| t.status.confirmed).collect();
            if confirmed.len() < PAGE_SIZE {
                log::debug!("Short page ({} confirmed), history exhausted", confirmed.len());
                break;
            }
            if pages >= MAX_PAGES {
                log::debug!("Stopped paging after {} pages", pages);
                break;
            }
            let Some(last) = confirmed.last().map(|t| t.txid.clone()) else {
                break;
            };
            if cursor.as_deref() == Some(last.as_str()) {
                log::debug!("Pagination cursor did not advance");
                break;
            }

            page = self
                .get_json(
                    provider,
                    &format!("{}/address/{}/txs/chain/{}", base, address, last),
                    cancel,
                )
                .await?;
            pages += 1;
            cursor = Some(last);
            if page.is_empty() {
                break;
            }
            scan.scan(&page, address, tip);
        }

        let confirmed = stats.chain_stats.balance();
        let unconfirmed = stats.mempool_stats.balance();
        Ok(AddressSummary {
            address: address.to_string(),
            confirmed_balance_sats: confirmed,
            unconfirmed_balance_sats: unconfirmed,
            total_balance_sats: confirmed + unconfirmed,
            tx_count: stats.chain_stats.tx_count + stats.mempool_stats.tx_count,
            tip_height: tip,
            last_funding_tx: scan.latest,
            last_confirmed_funding_tx: scan.latest_confirmed,
            provider_used: provider,
            used_fallback_provider: false,
            fetched_at: Utc::now(),
        })
    }

    /// Tip height. A provider answering the address endpoints but not this
    /// one still yields a summary, just without confirmation counts.
    async fn tip_height(
        &self,
        provider: Provider,
        base: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<u32>, ExplorerError> {
        match self
            .get_text(provider, &format!("{}/blocks/tip/height", base), cancel)
            .await
        {
            Ok(text) => match text.trim().parse::<u32>() {
                Ok(height) => Ok(Some(height)),
                Err(_) => {
                    log::warn!("{} returned a non-numeric tip height", provider);
                    Ok(None)
                }
            },
            Err(ExplorerError::Cancelled) => Err(ExplorerError::Cancelled),
            Err(e) => {
                log::warn!("Tip height unavailable from {}: {}", provider, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esplora::{EsploraVout, TxStatus};

    const ADDR: &str = "tb1qvaultaddress0000";

    fn tx(txid: &str, to_vault: u64, height: Option<u32>) -> EsploraTx {
        EsploraTx {
            txid: txid.into(),
            vout: vec![EsploraVout {
                scriptpubkey_address: Some((if to_vault > 0 { ADDR } else { "tb1qother" }).into()),
                value: to_vault.max(1),
            }],
            status: TxStatus {
                confirmed: height.is_some(),
                block_height: height,
                block_time: height.map(|h| 1_700_000_000 + i64::from(h)),
            },
        }
    }

    #[test]
    fn test_confirmations_from_tip() {
        let event = funding_event(&tx("a", 5000, Some(100)), ADDR, Some(120)).unwrap();
        assert_eq!(event.confirmations, Some(21));
        assert!(event.confirmed);

        let event = funding_event(&tx("a", 5000, Some(100)), ADDR, None).unwrap();
        assert_eq!(event.confirmations, None);
    }

    #[test]
    fn test_non_funding_tx_ignored() {
        assert!(funding_event(&tx("a", 0, Some(100)), ADDR, Some(120)).is_none());
    }

    #[test]
    fn test_scan_picks_newest_of_each_kind() {
        let page = vec![
            tx("spend", 0, None),
            tx("pending", 700, None),
            tx("newer", 500, Some(110)),
            tx("older", 900, Some(100)),
        ];
        let mut scan = FundingScan::default();
        scan.scan(&page, ADDR, Some(120));
        assert_eq!(scan.latest.as_ref().unwrap().txid, "pending");
        assert!(scan.latest.as_ref().unwrap().confirmations.is_none());
        assert_eq!(scan.latest_confirmed.as_ref().unwrap().txid, "newer");
        assert_eq!(scan.latest_confirmed.as_ref().unwrap().confirmations, Some(11));
        assert!(scan.complete());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address(ADDR).is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address("tb1q/../../blocks/tip").is_err());
        assert!(validate_address("short").is_err());
    }
}
