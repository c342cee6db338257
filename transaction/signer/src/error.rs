// Copyright (c) 2018-2022 The Botho Foundation

use displaydoc::Display;

use crate::state::TState;

/// Every failure mode of a signing session. By policy every one of these is
/// fatal: the session's key material is torn down and no further calls are
/// accepted (see [`crate::session::SignerSession::is_poisoned`]).
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerError {
    /// `{0:?}` does not permit this call in the current phase
    IllegalState(TState),
    /// HMAC verification failed on resubmitted data
    Authentication,
    /// AEAD decryption of `alpha` failed
    AeadFailure,
    /// `real_output` {0} is out of bounds for a ring of size {1}
    RealOutputOutOfBounds(usize, usize),
    /// declared input count {0} does not match ingested count {1}
    InputCountMismatch(usize, usize),
    /// declared output count {0} does not match ingested count {1}
    OutputCountMismatch(usize, usize),
    /// commitment balance violated: `sumout != sumpouts_alphas`
    BalanceMismatch,
    /// outputs exceed inputs: fee would be negative
    NegativeFee,
    /// more than one destination requested an encrypted payment id
    MultiplePaymentIdDestinations,
    /// payment id must be exactly 8 bytes, got {0}
    InvalidPaymentIdLength(usize),
    /// invalid point or scalar encoding
    CryptoContract,
    /// range-proof self-verification failed
    RangeProofSelfTestFailed,
    /// MLSAG self-verification failed
    MlsagSelfTestFailed,
    /// transaction has no inputs
    NoInputs,
    /// transaction has no outputs
    NoOutputs,
    /// multisig is not supported by this signer
    MultisigUnsupported,
}

#[cfg(feature = "std")]
impl std::error::Error for SignerError {}

impl From<xmrsign_ring_signature::Error> for SignerError {
    fn from(_: xmrsign_ring_signature::Error) -> Self {
        SignerError::CryptoContract
    }
}

impl From<xmrsign_transaction_core::TxError> for SignerError {
    fn from(e: xmrsign_transaction_core::TxError) -> Self {
        match e {
            xmrsign_transaction_core::TxError::InvalidPaymentIdLength(n) => {
                SignerError::InvalidPaymentIdLength(n)
            }
            xmrsign_transaction_core::TxError::RealOutputOutOfBounds(a, b) => {
                SignerError::RealOutputOutOfBounds(a, b)
            }
            xmrsign_transaction_core::TxError::NoInputs => SignerError::NoInputs,
            xmrsign_transaction_core::TxError::NoOutputs => SignerError::NoOutputs,
        }
    }
}
