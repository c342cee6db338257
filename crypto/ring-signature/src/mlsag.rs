// Copyright (c) 2018-2022 The Botho Foundation

//! MLSAG (Multilayered Linkable Spontaneous Anonymous Group) ring signatures.
//!
//! A ring member is a row vector of public keys; a signature proves
//! knowledge of the discrete logs of one column's worth of keys, without
//! revealing which column, while linking each row to a key image that
//! prevents the same secret being used in two signatures.
//!
//! RingCT only ever uses 2-row rings: row 0 is the spent output's one-time
//! key, row 1 is the difference between a ring member's commitment and the
//! transaction's own commitment (the pseudo-out for Simple RCT, or the
//! summed output commitments plus the fee for Full RCT). Proving knowledge
//! of row 1's discrete log at the real index is what proves the transaction
//! conserves value without revealing either side's blinding factor.

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, traits::Identity, EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use xmrsign_crypto_keys::hash::{hash_to_point, hash_to_scalar};

use crate::Error;

/// Number of rows in every RingCT MLSAG: the spend key and the commitment
/// balance.
pub const ROWS: usize = 2;

/// An MLSAG signature over a `ROWS x cols` ring.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MlsagSignature {
    /// The key images for each row (row 0's is the transaction's on-chain
    /// key image; row 1's exists only to close the sigma protocol).
    pub key_images: [EdwardsPoint; ROWS],
    /// The initial challenge `c0`.
    pub c0: Scalar,
    /// The per-column, per-row responses.
    pub s: alloc::vec::Vec<[Scalar; ROWS]>,
}

fn add_keys1(a: &Scalar, b: &Scalar, point: &EdwardsPoint) -> EdwardsPoint {
    a * ED25519_BASEPOINT_TABLE + b * point
}

fn add_keys2(a: &Scalar, big_a: &EdwardsPoint, b: &Scalar, big_b: &EdwardsPoint) -> EdwardsPoint {
    a * big_a + b * big_b
}

fn hash_ring_message(ring: &[[EdwardsPoint; ROWS]]) -> alloc::vec::Vec<u8> {
    let mut m = alloc::vec::Vec::with_capacity(ring.len() * ROWS * 32);
    for column in ring {
        for key in column {
            m.extend_from_slice(key.compress().as_bytes());
        }
    }
    m
}

fn chain_hash(m: &[u8], l: &[EdwardsPoint; ROWS], r: &[EdwardsPoint; ROWS]) -> Scalar {
    let mut buf = alloc::vec::Vec::with_capacity(m.len() + ROWS * 64);
    buf.extend_from_slice(m);
    for p in l {
        buf.extend_from_slice(p.compress().as_bytes());
    }
    for p in r {
        buf.extend_from_slice(p.compress().as_bytes());
    }
    hash_to_scalar(&buf)
}

/// Signs `ring` (a `cols`-member ring of 2-row public-key columns) at
/// `real_index`, knowing the discrete logs `secrets` of that column.
///
/// This is the direct generic MLSAG construction both RingCT variants
/// build on: Simple RCT calls it once per input with `ring[*][1]` set to
/// each mix member's commitment minus the input's own pseudo-out; Full RCT
/// (single-input transactions only) calls it once with `ring[*][1]` set to
/// each mix member's commitment minus the sum of output commitments and the
/// fee.
pub fn sign<R: RngCore + CryptoRng>(
    rng: &mut R,
    ring: &[[EdwardsPoint; ROWS]],
    secrets: &[Scalar; ROWS],
    real_index: usize,
) -> Result<MlsagSignature, Error> {
    let cols = ring.len();
    if real_index >= cols {
        return Err(Error::IndexOutOfBounds(real_index, cols));
    }

    let key_images: [EdwardsPoint; ROWS] =
        core::array::from_fn(|row| secrets[row] * hash_to_point(ring[real_index][row].compress().as_bytes()));

    let m = hash_ring_message(ring);

    let alpha: [Scalar; ROWS] = core::array::from_fn(|_| Scalar::random(rng));
    let mut s: alloc::vec::Vec<[Scalar; ROWS]> = alloc::vec![[Scalar::ZERO; ROWS]; cols];

    let l_real: [EdwardsPoint; ROWS] = core::array::from_fn(|row| alpha[row] * ED25519_BASEPOINT_TABLE);
    let r_real: [EdwardsPoint; ROWS] = core::array::from_fn(|row| {
        alpha[row] * hash_to_point(ring[real_index][row].compress().as_bytes())
    });

    let mut c = alloc::vec![Scalar::ZERO; cols];
    let mut idx = (real_index + 1) % cols;
    c[idx] = chain_hash(&m, &l_real, &r_real);

    while idx != real_index {
        let col_s: [Scalar; ROWS] = core::array::from_fn(|_| Scalar::random(rng));
        let l: [EdwardsPoint; ROWS] =
            core::array::from_fn(|row| add_keys1(&col_s[row], &c[idx], &ring[idx][row]));
        let r: [EdwardsPoint; ROWS] = core::array::from_fn(|row| {
            add_keys2(
                &col_s[row],
                &hash_to_point(ring[idx][row].compress().as_bytes()),
                &c[idx],
                &key_images[row],
            )
        });
        s[idx] = col_s;

        let next = (idx + 1) % cols;
        c[next] = chain_hash(&m, &l, &r);
        idx = next;
    }

    s[real_index] = core::array::from_fn(|row| alpha[row] - c[real_index] * secrets[row]);

    Ok(MlsagSignature {
        key_images,
        c0: c[(real_index + 1) % cols],
        s,
    })
}

/// Verifies an MLSAG signature. `c0` must be the challenge that was chained
/// from the column immediately after the (unknown) real index; verification
/// walks the whole ring and checks the chain closes back on `c0`.
pub fn verify(ring: &[[EdwardsPoint; ROWS]], sig: &MlsagSignature) -> Result<(), Error> {
    let cols = ring.len();
    if sig.s.len() != cols {
        return Err(Error::LengthMismatch(sig.s.len(), cols));
    }

    let m = hash_ring_message(ring);
    let mut c = sig.c0;
    let first_c = sig.c0;

    for i in 0..cols {
        let l: [EdwardsPoint; ROWS] = core::array::from_fn(|row| add_keys1(&sig.s[i][row], &c, &ring[i][row]));
        let r: [EdwardsPoint; ROWS] = core::array::from_fn(|row| {
            add_keys2(
                &sig.s[i][row],
                &hash_to_point(ring[i][row].compress().as_bytes()),
                &c,
                &sig.key_images[row],
            )
        });
        c = chain_hash(&m, &l, &r);
    }

    if c == first_c {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    fn random_ring<R: RngCore + CryptoRng>(rng: &mut R, cols: usize) -> (Vec<[EdwardsPoint; ROWS]>, usize, [Scalar; ROWS]) {
        let real_index = (cols / 2).max(0);
        let mut ring = Vec::with_capacity(cols);
        let mut real_secrets = [Scalar::ZERO; ROWS];
        for i in 0..cols {
            if i == real_index {
                let s0 = Scalar::random(rng);
                let s1 = Scalar::random(rng);
                real_secrets = [s0, s1];
                ring.push([s0 * ED25519_BASEPOINT_TABLE, s1 * ED25519_BASEPOINT_TABLE]);
            } else {
                ring.push([
                    Scalar::random(rng) * ED25519_BASEPOINT_TABLE,
                    Scalar::random(rng) * ED25519_BASEPOINT_TABLE,
                ]);
            }
        }
        (ring, real_index, real_secrets)
    }

    #[test]
    fn signs_and_verifies() {
        run_with_several_seeds(|mut rng| {
            let (ring, index, secrets) = random_ring(&mut rng, 5);
            let sig = sign(&mut rng, &ring, &secrets, index).unwrap();
            assert!(verify(&ring, &sig).is_ok());
        });
    }

    #[test]
    fn rejects_wrong_ring() {
        run_with_several_seeds(|mut rng| {
            let (ring, index, secrets) = random_ring(&mut rng, 4);
            let sig = sign(&mut rng, &ring, &secrets, index).unwrap();
            let (other_ring, _, _) = random_ring(&mut rng, 4);
            assert!(verify(&other_ring, &sig).is_err());
        });
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        run_with_several_seeds(|mut rng| {
            let (ring, _index, secrets) = random_ring(&mut rng, 3);
            assert!(sign(&mut rng, &ring, &secrets, 99).is_err());
        });
    }
}
