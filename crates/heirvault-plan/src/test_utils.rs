//! Shared test utilities for heirvault-plan tests.
//!
//! Deterministic keys and plan requests used across test modules.

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use heirvault_shamir::ShamirConfig;

use crate::types::{AddressType, InheritanceType, Network, PlanInput, RecoveryMethod};
use crate::validate::CompressedKey;

pub const OWNER_SEED: u8 = 1;
pub const BENEFICIARY_SEED: u8 = 2;

/// Generate a deterministic keypair from a seed byte.
///
/// The secret key is `[0x01, 0x00, ..., 0x00, seed]` (32 bytes).
pub fn test_keypair(seed_byte: u8) -> (SecretKey, PublicKey) {
    let secp = Secp256k1::new();
    let mut secret_bytes = [0u8; 32];
    secret_bytes[31] = seed_byte;
    secret_bytes[0] = 0x01;
    let sk = SecretKey::from_slice(&secret_bytes).unwrap();
    let pk = sk.public_key(&secp);
    (sk, pk)
}

pub fn test_key(seed_byte: u8) -> CompressedKey {
    CompressedKey::from_bytes(test_keypair(seed_byte).1.serialize())
}

pub fn test_key_hex(seed_byte: u8) -> String {
    test_key(seed_byte).to_hex()
}

/// Testnet taproot request with a beneficiary-held key
pub fn single_plan(locktime_blocks: u32) -> PlanInput {
    PlanInput {
        network: Network::Testnet,
        inheritance_type: InheritanceType::TimelockRecovery,
        owner_pubkey: test_key_hex(OWNER_SEED),
        beneficiary_pubkey: test_key_hex(BENEFICIARY_SEED),
        locktime_blocks,
        address_type: AddressType::SegwitV1,
        recovery_method: RecoveryMethod::Single,
        sss_config: None,
    }
}

/// Testnet taproot request whose beneficiary key is generated and split
pub fn social_plan(locktime_blocks: u32, threshold: u8, total: u8) -> PlanInput {
    PlanInput {
        beneficiary_pubkey: String::new(),
        recovery_method: RecoveryMethod::Social,
        sss_config: Some(ShamirConfig { threshold, total }),
        ..single_plan(locktime_blocks)
    }
}
