// Copyright (c) 2018-2022 The Botho Foundation

//! The serializable pieces of a finished transaction: the plain tx-prefix
//! inputs/outputs and the RingCT signature structure that rides alongside
//! them.

use xmrsign_crypto_keys::CompressedPoint;
use xmrsign_ring_signature::{borromean::RangeSig, mlsag::MlsagSignature, Commitment, EcdhTuple, KeyImage};

/// A tx-prefix input: a key image plus the absolute output indices of its
/// ring, delta-encoded the way the wire format stores them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxinToKey {
    /// Cleartext amount; always 0 for RingCT inputs.
    pub amount: u64,
    /// Ring member output indices, delta-encoded (first absolute, rest
    /// relative to the previous).
    pub key_offsets: alloc::vec::Vec<u64>,
    /// The spent output's key image, published to prevent double-spends.
    pub k_image: KeyImage,
}

/// A tx-prefix output: the one-time destination key the recipient scans for.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOut {
    /// Cleartext amount; always 0 for RingCT outputs.
    pub amount: u64,
    /// The one-time output public key.
    pub target: CompressedPoint,
}

/// Which RingCT signature layout a transaction uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RctType {
    /// A single MLSAG spans every input and every output together.
    Full,
    /// Each input carries its own MLSAG and pseudo-out commitment.
    Simple,
}

/// The non-pruned half of a RingCT signature: the fee, and per-output
/// ECDH-masked amounts and commitments.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RctSigBase {
    /// Which layout this signature uses.
    pub rct_type: RctType,
    /// The transaction fee, in atomic units, spent but not sent to any
    /// output.
    pub txn_fee: u64,
    /// Per-output ECDH-encoded `(mask, amount)` pairs, in output order.
    pub ecdh_info: alloc::vec::Vec<EcdhTuple>,
    /// Per-output Pedersen commitments, in output order.
    pub out_pk: alloc::vec::Vec<Commitment>,
}

/// The prunable half: range proofs, pseudo-outs, and the MLSAG signatures
/// themselves.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RctSigPrunable {
    /// Per-output range proofs, in output order.
    pub range_sigs: alloc::vec::Vec<RangeSig>,
    /// Per-input MLSAG signatures.
    pub mlsag_sigs: alloc::vec::Vec<MlsagSignature>,
    /// Simple RCT's per-input pseudo-out commitments; empty for Full RCT,
    /// which balances against the summed output commitments directly.
    pub pseudo_outs: alloc::vec::Vec<Commitment>,
}
