//! Spend both vault paths and check the transactions against Bitcoin Core's
//! consensus rules (libbitcoinconsensus).
//!
//! CSV compares the spending input's nSequence against the script value, so
//! no chain is needed: a sequence below the locktime must fail, one at the
//! locktime must pass.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::Encodable;
use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{Keypair, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{LeafVersion, Signature as TapSignature, TapLeafHash};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, CompressedPublicKey, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxOut, Witness,
};
use std::str::FromStr;

use heirvault_plan::{
    build, AddressType, InheritanceType, Network, PlanInput, PlanOutput, RecoveryMethod,
};

const LOCKTIME: u32 = 144;

fn test_keypair(seed: u8) -> (SecretKey, PublicKey) {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    bytes[0] = 0x01;
    let sk = SecretKey::from_slice(&bytes).unwrap();
    let pk = sk.public_key(&secp);
    (sk, pk)
}

fn make_plan(address_type: AddressType) -> PlanOutput {
    let (_, owner_pk) = test_keypair(1);
    let (_, heir_pk) = test_keypair(2);
    build(&PlanInput {
        network: Network::Regtest,
        inheritance_type: InheritanceType::TimelockRecovery,
        owner_pubkey: hex::encode(owner_pk.serialize()),
        beneficiary_pubkey: hex::encode(heir_pk.serialize()),
        locktime_blocks: LOCKTIME,
        address_type,
        recovery_method: RecoveryMethod::Single,
        sss_config: None,
    })
    .unwrap()
}

/// Vault output as funded on chain
fn funding_output(plan: &PlanOutput) -> TxOut {
    let address = Address::from_str(&plan.address)
        .unwrap()
        .require_network(bitcoin::Network::Regtest)
        .unwrap();
    TxOut {
        value: Amount::from_sat(50_000),
        script_pubkey: address.script_pubkey(),
    }
}

fn spending_tx(sequence: Sequence) -> Transaction {
    let (_, owner_pk) = test_keypair(1);
    let destination = Address::p2wpkh(&CompressedPublicKey(owner_pk), bitcoin::Network::Regtest);
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: bitcoin::Txid::from_byte_array([0xAA; 32]),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(49_000),
            script_pubkey: destination.script_pubkey(),
        }],
    }
}

/// Consensus-verify input 0 of a transaction using libbitcoinconsensus.
fn consensus_verify(tx: &Transaction, spent: &TxOut) -> Result<(), bitcoinconsensus::Error> {
    let mut tx_bytes = Vec::new();
    tx.consensus_encode(&mut tx_bytes).unwrap();

    let sb = spent.script_pubkey.as_bytes();
    let utxos = [bitcoinconsensus::Utxo {
        script_pubkey: sb.as_ptr(),
        script_pubkey_len: sb.len() as u32,
        value: spent.value.to_sat() as i64,
    }];

    bitcoinconsensus::verify(sb, spent.value.to_sat(), &tx_bytes, Some(&utxos), 0)
}

/// Sign a P2WSH spend and assemble `[sig, selector, witness_script]`
fn sign_segwit_v0(
    plan: &PlanOutput,
    spent: &TxOut,
    signer: &SecretKey,
    sequence: Sequence,
    selector: &[u8],
) -> Transaction {
    let secp = Secp256k1::new();
    let witness_script = ScriptBuf::from_hex(&plan.witness_script).unwrap();
    let mut tx = spending_tx(sequence);

    let sighash = SighashCache::new(&tx)
        .p2wsh_signature_hash(0, &witness_script, spent.value, EcdsaSighashType::All)
        .unwrap();
    let msg = Message::from_digest(sighash.to_byte_array());
    let sig = bitcoin::ecdsa::Signature::sighash_all(secp.sign_ecdsa(&msg, signer));

    let mut witness = Witness::new();
    witness.push(sig.to_vec());
    witness.push(selector);
    witness.push(witness_script.as_bytes());
    tx.input[0].witness = witness;
    tx
}

/// Sign a tapscript spend and assemble `[sig, selector, leaf, control_block]`
fn sign_segwit_v1(
    plan: &PlanOutput,
    spent: &TxOut,
    signer: &SecretKey,
    sequence: Sequence,
    selector: &[u8],
) -> Transaction {
    let secp = Secp256k1::new();
    let leaf = ScriptBuf::from_hex(&plan.script_hex).unwrap();
    let control_block = hex::decode(plan.control_block.as_ref().unwrap()).unwrap();
    let mut tx = spending_tx(sequence);

    let leaf_hash = TapLeafHash::from_script(&leaf, LeafVersion::TapScript);
    let sighash = SighashCache::new(&tx)
        .taproot_script_spend_signature_hash(
            0,
            &Prevouts::All(&[spent.clone()]),
            leaf_hash,
            TapSighashType::Default,
        )
        .unwrap();
    let msg = Message::from_digest(*sighash.as_byte_array());
    let keypair = Keypair::from_secret_key(&secp, signer);
    let sig = TapSignature {
        signature: secp.sign_schnorr(&msg, &keypair),
        sighash_type: TapSighashType::Default,
    };

    let mut witness = Witness::new();
    witness.push(sig.to_vec());
    witness.push(selector);
    witness.push(leaf.as_bytes());
    witness.push(control_block);
    tx.input[0].witness = witness;
    tx
}

#[test]
fn test_segwit_v0_owner_path_spends_immediately() {
    let plan = make_plan(AddressType::SegwitV0);
    let spent = funding_output(&plan);
    let (owner_sk, _) = test_keypair(1);

    let tx = sign_segwit_v0(&plan, &spent, &owner_sk, Sequence::ENABLE_RBF_NO_LOCKTIME, &[1]);
    consensus_verify(&tx, &spent).expect("owner path must be valid without a timelock");
}

#[test]
fn test_segwit_v0_beneficiary_path_after_locktime() {
    let plan = make_plan(AddressType::SegwitV0);
    let spent = funding_output(&plan);
    let (heir_sk, _) = test_keypair(2);

    let tx = sign_segwit_v0(&plan, &spent, &heir_sk, Sequence::from_height(144), &[]);
    consensus_verify(&tx, &spent).expect("beneficiary path must be valid at the locktime");
}

#[test]
fn test_segwit_v0_beneficiary_path_before_locktime_fails() {
    let plan = make_plan(AddressType::SegwitV0);
    let spent = funding_output(&plan);
    let (heir_sk, _) = test_keypair(2);

    let tx = sign_segwit_v0(&plan, &spent, &heir_sk, Sequence::from_height(143), &[]);
    assert!(consensus_verify(&tx, &spent).is_err());
}

#[test]
fn test_segwit_v0_beneficiary_cannot_use_owner_path() {
    let plan = make_plan(AddressType::SegwitV0);
    let spent = funding_output(&plan);
    let (heir_sk, _) = test_keypair(2);

    let tx = sign_segwit_v0(&plan, &spent, &heir_sk, Sequence::from_height(144), &[1]);
    assert!(consensus_verify(&tx, &spent).is_err());
}

#[test]
fn test_taproot_owner_script_path() {
    let plan = make_plan(AddressType::SegwitV1);
    let spent = funding_output(&plan);
    let (owner_sk, _) = test_keypair(1);

    let tx = sign_segwit_v1(&plan, &spent, &owner_sk, Sequence::ENABLE_RBF_NO_LOCKTIME, &[1]);
    consensus_verify(&tx, &spent).expect("owner leaf branch must be valid");
}

#[test]
fn test_taproot_beneficiary_script_path() {
    let plan = make_plan(AddressType::SegwitV1);
    let spent = funding_output(&plan);
    let (heir_sk, _) = test_keypair(2);

    let tx = sign_segwit_v1(&plan, &spent, &heir_sk, Sequence::from_height(144), &[]);
    consensus_verify(&tx, &spent).expect("beneficiary leaf branch must be valid at the locktime");

    let early = sign_segwit_v1(&plan, &spent, &heir_sk, Sequence::from_height(10), &[]);
    assert!(consensus_verify(&early, &spent).is_err());
}

#[test]
fn test_taproot_leaf_rejects_foreign_signature() {
    // Only holds because the leaf carries 32-byte keys
    let plan = make_plan(AddressType::SegwitV1);
    let spent = funding_output(&plan);
    let (stranger_sk, _) = test_keypair(9);

    let tx = sign_segwit_v1(&plan, &spent, &stranger_sk, Sequence::from_height(144), &[]);
    assert!(consensus_verify(&tx, &spent).is_err());

    let tx = sign_segwit_v1(&plan, &spent, &stranger_sk, Sequence::ENABLE_RBF_NO_LOCKTIME, &[1]);
    assert!(consensus_verify(&tx, &spent).is_err());
}
