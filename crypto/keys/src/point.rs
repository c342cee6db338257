// Copyright (c) 2018-2022 The Botho Foundation

use core::{convert::TryFrom, fmt};

use curve25519_dalek::edwards::CompressedEdwardsY;

use crate::KeyError;

/// A 32-byte canonically-encoded Ed25519 point, as it appears on the wire.
///
/// This is the `CompressedPoint` analogue of `CompressedRistretto`: it does
/// not decompress eagerly, so building up a ring of keys from serialized
/// data is cheap even before every point in it is needed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressedPoint(pub [u8; 32]);

impl CompressedPoint {
    /// Decompresses to an `EdwardsPoint`, rejecting non-canonical or
    /// off-curve encodings.
    pub fn decompress(&self) -> Result<curve25519_dalek::EdwardsPoint, KeyError> {
        CompressedEdwardsY(self.0)
            .decompress()
            .ok_or(KeyError::InvalidPoint)
    }

    /// Raw bytes as they appear on the wire.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<curve25519_dalek::EdwardsPoint> for CompressedPoint {
    fn from(point: curve25519_dalek::EdwardsPoint) -> Self {
        CompressedPoint(point.compress().to_bytes())
    }
}

impl TryFrom<&[u8]> for CompressedPoint {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength)?;
        Ok(CompressedPoint(arr))
    }
}

impl From<[u8; 32]> for CompressedPoint {
    fn from(bytes: [u8; 32]) -> Self {
        CompressedPoint(bytes)
    }
}

impl fmt::Debug for CompressedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPoint({})", hex::encode(self.0))
    }
}

impl fmt::Display for CompressedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
