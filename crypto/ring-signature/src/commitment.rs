// Copyright (c) 2018-2022 The Botho Foundation

use core::ops::{Add, Sub};

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, traits::Identity, EdwardsPoint, Scalar};
use xmrsign_crypto_keys::{generators::h_generator, CompressedPoint};

/// A Pedersen commitment `C = mask*G + amount*H`.
///
/// Commitments are additively homomorphic: the sum of a set of input
/// pseudo-out commitments equals the sum of output commitments plus
/// `fee*H` exactly when the transaction conserves value, which is what the
/// MLSAG signature over the commitment row proves.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Commitment(pub EdwardsPoint);

impl Commitment {
    /// The identity commitment (`0*G + 0*H`).
    pub fn identity() -> Self {
        Commitment(EdwardsPoint::identity())
    }

    /// The underlying curve point.
    pub fn point(&self) -> &EdwardsPoint {
        &self.0
    }
}

impl From<Commitment> for CompressedPoint {
    fn from(c: Commitment) -> Self {
        CompressedPoint::from(c.0)
    }
}

impl Add for Commitment {
    type Output = Commitment;
    fn add(self, rhs: Commitment) -> Commitment {
        Commitment(self.0 + rhs.0)
    }
}

impl Sub for Commitment {
    type Output = Commitment;
    fn sub(self, rhs: Commitment) -> Commitment {
        Commitment(self.0 - rhs.0)
    }
}

/// `C = mask*G + amount*H`.
pub fn pedersen_commit(mask: &Scalar, amount: u64) -> Commitment {
    let amount_scalar = Scalar::from(amount);
    Commitment(mask * ED25519_BASEPOINT_TABLE + amount_scalar * h_generator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn commitments_are_additively_homomorphic() {
        run_with_several_seeds(|mut rng| {
            let m1 = Scalar::random(&mut rng);
            let m2 = Scalar::random(&mut rng);
            let c1 = pedersen_commit(&m1, 10);
            let c2 = pedersen_commit(&m2, 20);
            let combined = pedersen_commit(&(m1 + m2), 30);
            assert!((c1 + c2).0 == combined.0);
        });
    }
}
