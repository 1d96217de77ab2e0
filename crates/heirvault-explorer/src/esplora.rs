//! Esplora REST response shapes (only the fields we read).

use serde::Deserialize;

/// `GET /address/{a}`
#[derive(Debug, Clone, Deserialize)]
pub struct AddressStats {
    pub address: String,
    pub chain_stats: TxoStats,
    pub mempool_stats: TxoStats,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TxoStats {
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
    pub tx_count: u64,
}

impl TxoStats {
    /// Funded minus spent; negative for mempool spends of confirmed coins
    pub fn balance(&self) -> i64 {
        self.funded_txo_sum as i64 - self.spent_txo_sum as i64
    }
}

/// One entry of `GET /address/{a}/txs`
#[derive(Debug, Clone, Deserialize)]
pub struct EsploraTx {
    pub txid: String,
    #[serde(default)]
    pub vout: Vec<EsploraVout>,
    pub status: TxStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsploraVout {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u32>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

impl EsploraTx {
    /// Sum of outputs paying `address` (bech32 compares case-insensitively)
    pub fn funded_to(&self, address: &str) -> u64 {
        self.vout
            .iter()
            .filter(|o| {
                o.scriptpubkey_address
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(address))
            })
            .map(|o| o.value)
            .sum()
    }
}
