// Copyright (c) 2018-2022 The Botho Foundation

use displaydoc::Display;
use xmrsign_transaction_signer::SignerError;

/// Failures the Host can hit while driving a signer session through
/// `transfer_unsigned`. A signer-side failure already poisoned the
/// session; this just threads its error kind through.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// the signer rejected a call: {0}
    Signer(SignerError),
    /// a transaction must have at least one destination
    NoDestinations,
    /// a transaction must have at least one source
    NoSources,
}

impl From<SignerError> for BuilderError {
    fn from(e: SignerError) -> Self {
        BuilderError::Signer(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuilderError {}
