// Copyright (c) 2018-2022 The Botho Foundation

//! The two incremental hashers the signer feeds as it streams a
//! transaction's inputs and outputs, rather than holding the whole
//! transaction in memory to hash it at the end.
//!
//! [`TxPrefixHasher`] accumulates the tx-prefix fields (version, unlock
//! time, vin, vout, extra) into the transaction's prefix hash. [`PreMlsagHasher`]
//! accumulates the RingCT signature fields (fee, ecdhInfo, outPk, range
//! proofs) into the "full message" every MLSAG signature in the
//! transaction is computed over, binding each input's signature to the
//! whole transaction's shape.

use xmrsign_crypto_keys::hash::keccak256;
use xmrsign_crypto_keys::varint::write_varint;
use xmrsign_ring_signature::{borromean::RangeSig, Commitment, EcdhTuple};

use crate::wire::{RctType, TxOut, TxinToKey};

/// Accumulates a transaction's prefix fields into its prefix hash.
///
/// Field order matches the wire serialization: version, unlock_time, vin
/// count then entries, vout count then entries, extra.
pub struct TxPrefixHasher {
    buf: alloc::vec::Vec<u8>,
}

impl TxPrefixHasher {
    /// Starts a new prefix hash for a transaction of the given version and
    /// unlock time.
    pub fn new(version: u64, unlock_time: u64) -> Self {
        let mut buf = alloc::vec::Vec::new();
        write_varint(version, &mut buf);
        write_varint(unlock_time, &mut buf);
        Self { buf }
    }

    /// Declares the number of inputs, ahead of the individual `add_vin`
    /// calls; the signer knows this count before it starts streaming
    /// inputs.
    pub fn set_vin_count(&mut self, count: usize) {
        write_varint(count as u64, &mut self.buf);
    }

    /// Absorbs one input.
    pub fn add_vin(&mut self, vin: &TxinToKey) {
        write_varint(vin.amount, &mut self.buf);
        write_varint(vin.key_offsets.len() as u64, &mut self.buf);
        for offset in &vin.key_offsets {
            write_varint(*offset, &mut self.buf);
        }
        self.buf.extend_from_slice(vin.k_image.as_bytes());
    }

    /// Declares the number of outputs, ahead of the individual `add_vout`
    /// calls.
    pub fn set_vout_count(&mut self, count: usize) {
        write_varint(count as u64, &mut self.buf);
    }

    /// Absorbs one output.
    pub fn add_vout(&mut self, vout: &TxOut) {
        write_varint(vout.amount, &mut self.buf);
        self.buf.extend_from_slice(vout.target.as_bytes());
    }

    /// Absorbs the `extra` field (tx public key(s), payment id, ...).
    pub fn add_extra(&mut self, extra: &[u8]) {
        write_varint(extra.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(extra);
    }

    /// Finalizes the prefix hash.
    pub fn finalize(&self) -> [u8; 32] {
        keccak256(&self.buf)
    }
}

/// Accumulates a RingCT signature's fields into the message every MLSAG
/// signature in the transaction signs.
///
/// Mirrors Monero's `get_pre_mlsag_hash`: the tx prefix hash, a hash of the
/// non-prunable RCT fields (type, fee, ecdhInfo, outPk), and a hash of the
/// prunable range proofs are concatenated and hashed once more.
pub struct PreMlsagHasher {
    prefix_hash: [u8; 32],
    base_buf: alloc::vec::Vec<u8>,
    rangeproof_buf: alloc::vec::Vec<u8>,
}

impl PreMlsagHasher {
    /// Starts a new pre-MLSAG hash for a transaction whose prefix hash is
    /// already known, and whose RCT type and fee are fixed.
    pub fn new(prefix_hash: [u8; 32], rct_type: RctType, txn_fee: u64) -> Self {
        let mut base_buf = alloc::vec::Vec::new();
        base_buf.push(match rct_type {
            RctType::Full => 0u8,
            RctType::Simple => 2u8,
        });
        write_varint(txn_fee, &mut base_buf);
        Self {
            prefix_hash,
            base_buf,
            rangeproof_buf: alloc::vec::Vec::new(),
        }
    }

    /// Declares the number of pseudo-outs, ahead of the individual
    /// `add_pseudo_out` calls; empty (count 0) for Full RCT.
    pub fn set_pseudo_outs_count(&mut self, count: usize) {
        write_varint(count as u64, &mut self.base_buf);
    }

    /// Absorbs one input's Simple-RCT pseudo-out commitment.
    pub fn add_pseudo_out(&mut self, commitment: &Commitment) {
        self.base_buf.extend_from_slice(commitment.point().compress().as_bytes());
    }

    /// Absorbs one output's masked `(mask, amount)` ECDH tuple.
    pub fn add_ecdh(&mut self, tuple: &EcdhTuple) {
        self.base_buf.extend_from_slice(tuple.mask.as_bytes());
        self.base_buf.extend_from_slice(tuple.amount.as_bytes());
    }

    /// Absorbs one output's Pedersen commitment.
    pub fn add_out_pk(&mut self, commitment: &Commitment) {
        self.base_buf.extend_from_slice(commitment.point().compress().as_bytes());
    }

    /// Absorbs one output's range proof.
    pub fn add_range_sig(&mut self, sig: &RangeSig) {
        self.rangeproof_buf.extend_from_slice(&sig.canonical_bytes());
    }

    /// Finalizes the full message: `Hs(prefix_hash || Hs(base) || Hs(rangeproofs))`.
    pub fn finalize(&self) -> [u8; 32] {
        let base_hash = keccak256(&self.base_buf);
        let rangeproof_hash = keccak256(&self.rangeproof_buf);
        let mut combined = alloc::vec::Vec::with_capacity(96);
        combined.extend_from_slice(&self.prefix_hash);
        combined.extend_from_slice(&base_hash);
        combined.extend_from_slice(&rangeproof_hash);
        keccak256(&combined)
    }
}

#[cfg(test)]
mod tests {
    use xmrsign_crypto_keys::CompressedPoint;
    use xmrsign_ring_signature::KeyImage;

    use super::*;

    #[test]
    fn prefix_hash_is_deterministic_and_order_sensitive() {
        let vin = TxinToKey {
            amount: 0,
            key_offsets: alloc::vec![3, 5],
            k_image: KeyImage::from(curve25519_dalek::constants::ED25519_BASEPOINT_POINT),
        };
        let vout = TxOut {
            amount: 0,
            target: CompressedPoint::from(curve25519_dalek::constants::ED25519_BASEPOINT_POINT),
        };

        let mut h1 = TxPrefixHasher::new(2, 0);
        h1.set_vin_count(1);
        h1.add_vin(&vin);
        h1.set_vout_count(1);
        h1.add_vout(&vout);
        h1.add_extra(&[1, 2, 3]);

        let mut h2 = TxPrefixHasher::new(2, 0);
        h2.set_vin_count(1);
        h2.add_vin(&vin);
        h2.set_vout_count(1);
        h2.add_vout(&vout);
        h2.add_extra(&[1, 2, 3]);

        assert_eq!(h1.finalize(), h2.finalize());

        let mut h3 = TxPrefixHasher::new(2, 1);
        h3.set_vin_count(1);
        h3.add_vin(&vin);
        h3.set_vout_count(1);
        h3.add_vout(&vout);
        h3.add_extra(&[1, 2, 3]);

        assert_ne!(h1.finalize(), h3.finalize());
    }

    #[test]
    fn pre_mlsag_hash_changes_with_fee() {
        let prefix_hash = [9u8; 32];
        let h1 = PreMlsagHasher::new(prefix_hash, RctType::Simple, 100);
        let h2 = PreMlsagHasher::new(prefix_hash, RctType::Simple, 200);
        assert_ne!(h1.finalize(), h2.finalize());
    }
}
