//! Explorer providers and URL builders.

use heirvault_plan::Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ExplorerError;

/// Public Esplora deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// mempool.space
    #[default]
    Mempool,
    /// blockstream.info
    Blockstream,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Mempool => "mempool",
            Provider::Blockstream => "blockstream",
        }
    }

    /// The provider tried when this one fails
    pub fn other(self) -> Self {
        match self {
            Provider::Mempool => Provider::Blockstream,
            Provider::Blockstream => Provider::Mempool,
        }
    }

    /// Human-facing site root for `network`
    pub fn web_base(&self, network: Network) -> Result<&'static str, ExplorerError> {
        match (self, network) {
            (Provider::Mempool, Network::Mainnet) => Ok("https://mempool.space"),
            (Provider::Mempool, Network::Testnet) => Ok("https://mempool.space/testnet"),
            (Provider::Blockstream, Network::Mainnet) => Ok("https://blockstream.info"),
            (Provider::Blockstream, Network::Testnet) => Ok("https://blockstream.info/testnet"),
            (_, Network::Regtest) => Err(ExplorerError::NetworkUnsupported(network)),
        }
    }

    /// Esplora REST root for `network`
    pub fn api_base(&self, network: Network) -> Result<String, ExplorerError> {
        Ok(format!("{}/api", self.web_base(network)?))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mempool" => Ok(Provider::Mempool),
            "blockstream" => Ok(Provider::Blockstream),
            other => Err(ExplorerError::UnknownProvider(other.to_string())),
        }
    }
}

/// Explorer page for an address
pub fn explorer_address_url(
    network: Network,
    provider: Provider,
    address: &str,
) -> Result<String, ExplorerError> {
    Ok(format!("{}/address/{}", provider.web_base(network)?, address))
}

/// Explorer page for a transaction
pub fn explorer_tx_url(
    network: Network,
    provider: Provider,
    txid: &str,
) -> Result<String, ExplorerError> {
    Ok(format!("{}/tx/{}", provider.web_base(network)?, txid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_bases() {
        assert_eq!(
            Provider::Mempool.api_base(Network::Mainnet).unwrap(),
            "https://mempool.space/api"
        );
        assert_eq!(
            Provider::Mempool.api_base(Network::Testnet).unwrap(),
            "https://mempool.space/testnet/api"
        );
        assert_eq!(
            Provider::Blockstream.api_base(Network::Mainnet).unwrap(),
            "https://blockstream.info/api"
        );
        assert_eq!(
            Provider::Blockstream.api_base(Network::Testnet).unwrap(),
            "https://blockstream.info/testnet/api"
        );
    }

    #[test]
    fn test_regtest_unsupported() {
        for provider in [Provider::Mempool, Provider::Blockstream] {
            assert!(matches!(
                provider.api_base(Network::Regtest),
                Err(ExplorerError::NetworkUnsupported(Network::Regtest))
            ));
        }
        assert!(explorer_tx_url(Network::Regtest, Provider::Mempool, "00").is_err());
    }

    #[test]
    fn test_explorer_urls() {
        assert_eq!(
            explorer_address_url(Network::Testnet, Provider::Mempool, "tb1qxyz").unwrap(),
            "https://mempool.space/testnet/address/tb1qxyz"
        );
        assert_eq!(
            explorer_tx_url(Network::Mainnet, Provider::Blockstream, "ab").unwrap(),
            "https://blockstream.info/tx/ab"
        );
    }

    #[test]
    fn test_other_and_parse() {
        assert_eq!(Provider::Mempool.other(), Provider::Blockstream);
        assert_eq!(Provider::Blockstream.other(), Provider::Mempool);
        assert_eq!("blockstream".parse::<Provider>().unwrap(), Provider::Blockstream);
        assert!("electrum".parse::<Provider>().is_err());
    }
}
