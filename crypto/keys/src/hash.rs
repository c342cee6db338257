// Copyright (c) 2018-2022 The Botho Foundation

//! Monero's hash primitives: plain Keccak-256 ("cn_fast_hash"), hash-to-scalar
//! and hash-to-point.

use curve25519_dalek::{edwards::CompressedEdwardsY, EdwardsPoint, Scalar};
use sha3::{Digest, Keccak256};

/// `cn_fast_hash`: plain Keccak-256 (not SHA3, no NIST padding tweak).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Keccak-256 over the concatenation of several byte slices, without an
/// intermediate allocation.
pub fn keccak256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// `Hs`: hash bytes to a canonical scalar via Keccak-256 + reduction mod `l`.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256(data))
}

/// `Hs` over concatenated parts, e.g. `Hs(derivation || varint(i))`.
pub fn hash_to_scalar_parts(parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_parts(parts))
}

/// `Hp`: hash bytes to a point on the curve ("hash to EC").
///
/// Real Monero derives this via `ge_fromfe_frombytes`, an Elligator-style map
/// from a field element straight to a curve point. This crate instead uses
/// try-and-increment: reduce the hash to a compressed point candidate and
/// keep re-hashing until one decompresses, then clear the cofactor. It lands
/// in the same prime-order subgroup and satisfies every property the
/// signing protocol needs from `Hp` (a fixed, unpredictable point per input).
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let mut buf = keccak256(data);
    loop {
        if let Some(point) = CompressedEdwardsY(buf).decompress() {
            return point.mul_by_cofactor();
        }
        buf = keccak256(&buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_is_deterministic() {
        assert_eq!(keccak256(b"abc"), keccak256(b"abc"));
        assert_ne!(keccak256(b"abc"), keccak256(b"abd"));
    }

    #[test]
    fn hash_to_point_is_on_curve_and_torsion_free() {
        let p = hash_to_point(b"xmrsign-test");
        assert!(p.is_torsion_free());
    }

    #[test]
    fn hash_to_scalar_parts_matches_concatenation() {
        let a = hash_to_scalar(b"helloworld");
        let b = hash_to_scalar_parts(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }
}
