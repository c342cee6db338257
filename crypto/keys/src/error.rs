// Copyright (c) 2018-2022 The Botho Foundation

use displaydoc::Display;

/// Errors produced while decoding curve material.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// input was not 32 bytes long
    InvalidLength,
    /// bytes did not decode to a valid curve point
    InvalidPoint,
    /// scalar was not canonically reduced
    InvalidScalar,
}

#[cfg(feature = "std")]
impl std::error::Error for KeyError {}
