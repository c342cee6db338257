// Copyright (c) 2018-2022 The Botho Foundation

//! The two Pedersen-commitment generators, `G` and `H`.

use curve25519_dalek::{constants::ED25519_BASEPOINT_POINT, EdwardsPoint};
use once_cell::sync::Lazy;

use crate::hash::hash_to_point;

/// The standard Ed25519 base point, `G`.
pub fn basepoint() -> EdwardsPoint {
    ED25519_BASEPOINT_POINT
}

/// The second Pedersen generator, `H = Hp(G)`, independent of `G` under the
/// discrete log assumption. Computed once and cached.
pub fn h_generator() -> EdwardsPoint {
    static H: Lazy<EdwardsPoint> = Lazy::new(|| hash_to_point(ED25519_BASEPOINT_POINT.compress().as_bytes()));
    *H
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h_generator_is_stable_and_independent_looking() {
        let h1 = h_generator();
        let h2 = h_generator();
        assert_eq!(h1, h2);
        assert_ne!(h1, basepoint());
    }
}
