//! Vault address derivation
//!
//! Both encodings wrap the same spending conditions:
//!
//! ```text
//! segwit v0:  P2WSH(witness_script)             wsh(raw(<script>))
//! segwit v1:  P2TR(NUMS, { tapleaf(script) })   tr(<NUMS>, {<script>})
//! ```
//!
//! The taproot internal key is the BIP-341 NUMS point `H`, whose x
//! coordinate is SHA256 of the uncompressed generator. Nobody knows its
//! discrete log, so the key path is dead and the single script leaf is the
//! only way to spend.

use bitcoin::key::XOnlyPublicKey;
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::taproot::{ControlBlock, LeafVersion, TaprootBuilder, TaprootSpendInfo};
use bitcoin::{Address, ScriptBuf};

use crate::types::{AddressType, Network};
use crate::PlanError;

/// BIP-341 unspendable internal key (x-only, hex)
pub const NUMS_INTERNAL_KEY: &str =
    "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

/// A derived vault output
#[derive(Debug, Clone)]
pub struct VaultAddress {
    pub address: Address,
    /// Witness script (v0) or tapleaf script (v1)
    pub script: ScriptBuf,
    pub descriptor: String,
    /// Present for taproot only
    pub spend_info: Option<TaprootSpendInfo>,
}

impl VaultAddress {
    /// Control block proving the leaf is committed in the output key
    pub fn control_block(&self) -> Option<ControlBlock> {
        self.spend_info
            .as_ref()?
            .control_block(&(self.script.clone(), LeafVersion::TapScript))
    }
}

/// The NUMS point as a key
pub fn nums_point() -> Result<XOnlyPublicKey, PlanError> {
    let bytes = hex::decode(NUMS_INTERNAL_KEY)
        .map_err(|e| PlanError::AddressDerivationFailed(format!("NUMS point error: {}", e)))?;
    XOnlyPublicKey::from_slice(&bytes)
        .map_err(|e| PlanError::AddressDerivationFailed(format!("NUMS point error: {}", e)))
}

/// P2WSH output over the witness script
pub fn derive_segwit_v0(script: &ScriptBuf, network: Network) -> VaultAddress {
    VaultAddress {
        address: Address::p2wsh(script, network.to_bitcoin()),
        script: script.clone(),
        descriptor: format!("wsh(raw({}))", script.to_hex_string()),
        spend_info: None,
    }
}

/// P2TR output with a single script leaf under the NUMS internal key
pub fn derive_segwit_v1<C: Verification>(
    secp: &Secp256k1<C>,
    script: &ScriptBuf,
    network: Network,
) -> Result<VaultAddress, PlanError> {
    let internal_key = nums_point()?;

    let spend_info = TaprootBuilder::new()
        .add_leaf(0, script.clone())
        .map_err(|e| PlanError::AddressDerivationFailed(format!("taproot builder error: {}", e)))?
        .finalize(secp, internal_key)
        .map_err(|_| PlanError::AddressDerivationFailed("taproot finalize failed".into()))?;

    let address = Address::p2tr(
        secp,
        internal_key,
        spend_info.merkle_root(),
        network.to_bitcoin(),
    );

    Ok(VaultAddress {
        address,
        script: script.clone(),
        descriptor: format!(
            "tr({}, {{{}}})",
            NUMS_INTERNAL_KEY,
            script.to_hex_string()
        ),
        spend_info: Some(spend_info),
    })
}

/// Derive the output for `address_type`
pub fn derive<C: Verification>(
    secp: &Secp256k1<C>,
    address_type: AddressType,
    script: &ScriptBuf,
    network: Network,
) -> Result<VaultAddress, PlanError> {
    match address_type {
        AddressType::SegwitV0 => Ok(derive_segwit_v0(script, network)),
        AddressType::SegwitV1 => derive_segwit_v1(secp, script, network),
    }
}
