// Copyright (c) 2018-2022 The Botho Foundation

use displaydoc::Display;

/// Errors in the transaction data model: malformed requests, inconsistent
/// source/destination shapes.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// a payment id must be exactly 8 bytes, got {0}
    InvalidPaymentIdLength(usize),
    /// `real_output` {0} is out of bounds for a ring of size {1}
    RealOutputOutOfBounds(usize, usize),
    /// transaction has no inputs
    NoInputs,
    /// transaction has no outputs
    NoOutputs,
}

#[cfg(feature = "std")]
impl std::error::Error for TxError {}
