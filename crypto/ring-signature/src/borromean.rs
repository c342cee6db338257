// Copyright (c) 2018-2022 The Botho Foundation

//! Memory-optimized Borromean range proofs.
//!
//! Proves a committed amount lies in `[0, 2^ATOMS)` by decomposing it into
//! `ATOMS` bit-commitments `Ci = ai*G + bit_i*H`, each of which is proven (via
//! a 2-branch OR-sigma proof) to open to either `0` or `2^i`, all sharing one
//! combined Fiat-Shamir challenge `ee`. The construction here computes the
//! proof in two passes over the bits rather than holding both candidate
//! responses (`s0`, `s1`) live for all 64 bits at once, bounding peak memory
//! to `O(ATOMS)` scalars rather than `O(2*ATOMS)`.

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, traits::Identity, EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use xmrsign_crypto_keys::{generators::h_generator, hash::hash_to_scalar};

use crate::{commitment::Commitment, Error};

/// Number of bits a range proof covers; Monero amounts are 64-bit.
pub const ATOMS: usize = 64;

/// `aG + bB`.
fn add_keys1(a: &Scalar, b: &Scalar, point: &EdwardsPoint) -> EdwardsPoint {
    a * ED25519_BASEPOINT_TABLE + b * point
}

/// The Borromean ring signature over the 64 bit-commitments.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoroSig {
    #[cfg_attr(feature = "serde", serde(with = "scalar_array"))]
    s0: [Scalar; ATOMS],
    #[cfg_attr(feature = "serde", serde(with = "scalar_array"))]
    s1: [Scalar; ATOMS],
    ee: Scalar,
}

/// A full range proof: the per-bit commitments plus the Borromean signature
/// tying them together.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeSig {
    #[cfg_attr(feature = "serde", serde(with = "point_array"))]
    ci: [EdwardsPoint; ATOMS],
    asig: BoroSig,
}

impl RangeSig {
    /// The per-bit commitments `Ci`.
    pub fn bit_commitments(&self) -> &[EdwardsPoint; ATOMS] {
        &self.ci
    }

    /// Canonical byte encoding of the whole proof (`Ci`, then `s0`, `s1`,
    /// `ee`), for feeding into the transaction's pre-MLSAG hash.
    pub fn canonical_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut buf = alloc::vec::Vec::with_capacity(ATOMS * 32 * 3 + 32);
        for p in &self.ci {
            buf.extend_from_slice(p.compress().as_bytes());
        }
        for s in &self.asig.s0 {
            buf.extend_from_slice(s.as_bytes());
        }
        for s in &self.asig.s1 {
            buf.extend_from_slice(s.as_bytes());
        }
        buf.extend_from_slice(self.asig.ee.as_bytes());
        buf
    }
}

/// Generates a range proof for `amount`.
///
/// `last_mask`, when given, forces the sum of the per-bit blinding factors
/// to equal it: the final bit's blinding factor is solved for rather than
/// sampled, which is how the Simple RCT's last output is pinned to balance
/// `sumpouts_alphas`.
///
/// Returns `(C, mask, proof)` where `C = mask*G + amount*H` and `mask` is
/// the sum of the per-bit blinding factors.
pub fn prove_range<R: RngCore + CryptoRng>(
    rng: &mut R,
    amount: u64,
    last_mask: Option<Scalar>,
) -> (Commitment, Scalar, RangeSig) {
    let mut ai = [Scalar::ZERO; ATOMS];
    let mut alpha = [Scalar::ZERO; ATOMS];
    let mut ci = [EdwardsPoint::identity(); ATOMS];
    let mut s1 = [Scalar::ZERO; ATOMS];
    let mut running_mask = Scalar::ZERO;
    let mut c_accum = EdwardsPoint::identity();
    let mut h_pow = h_generator();

    let mut hasher_input: alloc::vec::Vec<u8> = alloc::vec::Vec::with_capacity(ATOMS * 32);

    for i in 0..ATOMS {
        let bit = (amount >> i) & 1 == 1;

        ai[i] = if last_mask.is_some() && i == ATOMS - 1 {
            last_mask.unwrap() - running_mask
        } else {
            Scalar::random(rng)
        };
        running_mask = running_mask + ai[i];

        alpha[i] = Scalar::random(rng);
        let l = alpha[i] * ED25519_BASEPOINT_TABLE;

        ci[i] = if bit {
            ai[i] * ED25519_BASEPOINT_TABLE + h_pow
        } else {
            ai[i] * ED25519_BASEPOINT_TABLE
        };
        c_accum = c_accum + ci[i];

        if bit {
            hasher_input.extend_from_slice(l.compress().as_bytes());
        } else {
            s1[i] = Scalar::random(rng);
            let c = hash_to_scalar(l.compress().as_bytes());
            let ci_h = ci[i] - h_pow;
            let l_closed = add_keys1(&s1[i], &c, &ci_h);
            hasher_input.extend_from_slice(l_closed.compress().as_bytes());
        }

        h_pow = h_pow + h_pow;
    }

    let ee = hash_to_scalar(&hasher_input);

    let mut s0 = [Scalar::ZERO; ATOMS];
    for i in 0..ATOMS {
        let bit = (amount >> i) & 1 == 1;
        if bit {
            s0[i] = Scalar::random(rng);
            let ll = add_keys1(&s0[i], &ee, &ci[i]);
            let cc = hash_to_scalar(ll.compress().as_bytes());
            s1[i] = alpha[i] - ai[i] * cc;
        } else {
            s0[i] = alpha[i] - ai[i] * ee;
        }
    }

    (
        Commitment(c_accum),
        running_mask,
        RangeSig {
            ci,
            asig: BoroSig { s0, s1, ee },
        },
    )
}

/// Verifies a range proof against the claimed commitment `c`.
pub fn ver_range(c: &Commitment, rsig: &RangeSig) -> Result<(), Error> {
    let mut h_pow = h_generator();
    let mut c_tmp = EdwardsPoint::identity();
    let mut ci_h = [EdwardsPoint::identity(); ATOMS];

    for i in 0..ATOMS {
        ci_h[i] = rsig.ci[i] - h_pow;
        c_tmp = c_tmp + rsig.ci[i];
        h_pow = h_pow + h_pow;
    }

    if c_tmp != c.0 {
        return Err(Error::InvalidRangeProof);
    }

    let mut hasher_input: alloc::vec::Vec<u8> = alloc::vec::Vec::with_capacity(ATOMS * 32);
    for i in 0..ATOMS {
        let l1 = add_keys1(&rsig.asig.s0[i], &rsig.asig.ee, &rsig.ci[i]);
        let c = hash_to_scalar(l1.compress().as_bytes());
        let l2 = add_keys1(&rsig.asig.s1[i], &c, &ci_h[i]);
        hasher_input.extend_from_slice(l2.compress().as_bytes());
    }

    let ee = hash_to_scalar(&hasher_input);
    if ee == rsig.asig.ee {
        Ok(())
    } else {
        Err(Error::InvalidRangeProof)
    }
}

#[cfg(feature = "serde")]
mod scalar_array {
    use curve25519_dalek::Scalar;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ATOMS;

    pub fn serialize<S: Serializer>(v: &[Scalar; ATOMS], s: S) -> Result<S::Ok, S::Error> {
        let bytes: alloc::vec::Vec<[u8; 32]> = v.iter().map(|s| *s.as_bytes()).collect();
        bytes.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[Scalar; ATOMS], D::Error> {
        let bytes: alloc::vec::Vec<[u8; 32]> = Deserialize::deserialize(d)?;
        let mut out = [Scalar::ZERO; ATOMS];
        for (dst, src) in out.iter_mut().zip(bytes.into_iter()) {
            *dst = Scalar::from_bytes_mod_order(src);
        }
        Ok(out)
    }
}

#[cfg(feature = "serde")]
mod point_array {
    use curve25519_dalek::EdwardsPoint;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ATOMS;

    pub fn serialize<S: Serializer>(v: &[EdwardsPoint; ATOMS], s: S) -> Result<S::Ok, S::Error> {
        let bytes: alloc::vec::Vec<[u8; 32]> = v.iter().map(|p| p.compress().to_bytes()).collect();
        bytes.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[EdwardsPoint; ATOMS], D::Error> {
        use curve25519_dalek::edwards::CompressedEdwardsY;
        let bytes: alloc::vec::Vec<[u8; 32]> = Deserialize::deserialize(d)?;
        let mut out = [EdwardsPoint::identity(); ATOMS];
        for (dst, src) in out.iter_mut().zip(bytes.into_iter()) {
            *dst = CompressedEdwardsY(src)
                .decompress()
                .ok_or_else(|| serde::de::Error::custom("invalid point"))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn boundary_amounts_round_trip() {
        run_with_several_seeds(|mut rng| {
            for amount in [0u64, 1, 255, 1 << 32, u64::MAX] {
                let (c, mask, proof) = prove_range(&mut rng, amount, None);
                assert_eq!(c.0, mask * ED25519_BASEPOINT_TABLE + Scalar::from(amount) * h_generator());
                assert!(ver_range(&c, &proof).is_ok());
            }
        });
    }

    #[test]
    fn last_mask_is_honored() {
        run_with_several_seeds(|mut rng| {
            let target_mask = Scalar::random(&mut rng);
            let (c, mask, proof) = prove_range(&mut rng, 42, Some(target_mask));
            assert_eq!(mask, target_mask);
            assert!(ver_range(&c, &proof).is_ok());
        });
    }

    #[test]
    fn tampered_commitment_is_rejected() {
        run_with_several_seeds(|mut rng| {
            let (c, _mask, proof) = prove_range(&mut rng, 7, None);
            let bogus = Commitment(c.0 + ED25519_BASEPOINT_TABLE * Scalar::ONE);
            assert!(ver_range(&bogus, &proof).is_err());
        });
    }
}
