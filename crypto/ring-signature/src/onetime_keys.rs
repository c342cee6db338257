// Copyright (c) 2018-2022 The Botho Foundation

//! The single-key linkable ring signature used to prove a key image was
//! derived from one of a set of public keys, without an accompanying
//! transaction. Wallets use this to let an auditor verify an exported key
//! image belongs to one of their outputs, separately from spending it.
//!
//! This is the one-row special case of [`crate::mlsag`]'s construction:
//! same sigma protocol, but over a single public key per ring member
//! instead of two, and chained over a caller-supplied prefix rather than a
//! hash of the ring itself.

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, traits::Identity, EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use xmrsign_crypto_keys::hash::{hash_to_point, hash_to_scalar};

use crate::Error;

/// A linkable ring signature over a single-key ring, proving knowledge of
/// the discrete log at one (unrevealed) column without revealing which.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyImageProof {
    pub c0: Scalar,
    pub s: alloc::vec::Vec<Scalar>,
}

fn chain_hash(prefix_hash: &[u8], l: &EdwardsPoint, r: &EdwardsPoint) -> Scalar {
    let mut buf = alloc::vec::Vec::with_capacity(prefix_hash.len() + 64);
    buf.extend_from_slice(prefix_hash);
    buf.extend_from_slice(l.compress().as_bytes());
    buf.extend_from_slice(r.compress().as_bytes());
    hash_to_scalar(&buf)
}

/// Proves `image = sec * Hp(pubs[sec_idx])` without revealing `sec_idx`,
/// chaining the sigma protocol over `prefix_hash` (conventionally the
/// encoded key image itself).
pub fn export_key_image_proof<R: RngCore + CryptoRng>(
    rng: &mut R,
    prefix_hash: &[u8],
    image: &EdwardsPoint,
    pubs: &[EdwardsPoint],
    sec: &Scalar,
    sec_idx: usize,
) -> Result<KeyImageProof, Error> {
    let cols = pubs.len();
    if sec_idx >= cols {
        return Err(Error::IndexOutOfBounds(sec_idx, cols));
    }

    let alpha = Scalar::random(rng);
    let mut s: alloc::vec::Vec<Scalar> = alloc::vec![Scalar::ZERO; cols];

    let l_real = alpha * ED25519_BASEPOINT_TABLE;
    let r_real = alpha * hash_to_point(pubs[sec_idx].compress().as_bytes());

    let mut c = alloc::vec![Scalar::ZERO; cols];
    let mut idx = (sec_idx + 1) % cols;
    c[idx] = chain_hash(prefix_hash, &l_real, &r_real);

    while idx != sec_idx {
        let col_s = Scalar::random(rng);
        let l = col_s * ED25519_BASEPOINT_TABLE + c[idx] * pubs[idx];
        let r = col_s * hash_to_point(pubs[idx].compress().as_bytes()) + c[idx] * image;
        s[idx] = col_s;

        let next = (idx + 1) % cols;
        c[next] = chain_hash(prefix_hash, &l, &r);
        idx = next;
    }

    s[sec_idx] = alpha - c[sec_idx] * sec;

    Ok(KeyImageProof {
        c0: c[(sec_idx + 1) % cols],
        s,
    })
}

/// Verifies a proof produced by [`export_key_image_proof`].
pub fn verify_key_image_proof(
    prefix_hash: &[u8],
    image: &EdwardsPoint,
    pubs: &[EdwardsPoint],
    sig: &KeyImageProof,
) -> Result<(), Error> {
    let cols = pubs.len();
    if sig.s.len() != cols {
        return Err(Error::LengthMismatch(sig.s.len(), cols));
    }

    let mut c = sig.c0;
    let first_c = sig.c0;
    for i in 0..cols {
        let l = sig.s[i] * ED25519_BASEPOINT_TABLE + c * pubs[i];
        let r = sig.s[i] * hash_to_point(pubs[i].compress().as_bytes()) + c * image;
        c = chain_hash(prefix_hash, &l, &r);
    }

    if c == first_c {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}
