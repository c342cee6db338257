// Copyright (c) 2018-2022 The Botho Foundation

use displaydoc::Display;

/// Errors produced by commitment, range-proof and MLSAG operations.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// ring index {0} is out of bounds for a ring of size {1}
    IndexOutOfBounds(usize, usize),
    /// the ring signature failed to verify
    InvalidSignature,
    /// the range proof failed to verify
    InvalidRangeProof,
    /// a curve point failed to decode
    InvalidCurvePoint,
    /// ring and secret-key row counts do not match ({0} vs {1})
    LengthMismatch(usize, usize),
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
