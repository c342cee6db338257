// Copyright (c) 2018-2022 The Botho Foundation

/// Whether a session streams per-input material back through the Host for
/// re-authentication, or keeps it resident across phases.
///
/// The reference implementation hard-codes `in_memory() = false`; every
/// production session is `Streaming`. `InMemory` is implemented to the same
/// semantics (it just skips the replay states, §4.1) and exercised by tests
/// rather than deleted, since a future transport might reasonably want it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionMode {
    /// Per-input material (vin, pseudo-out, alpha) is re-authenticated by
    /// the Host replaying it back through `input_vini`/`mlsag_pseudo_out`.
    Streaming,
    /// Per-input material stays resident in the session across phases; the
    /// replay states (6, 7, 8) are skipped.
    InMemory,
}

impl Default for SessionMode {
    fn default() -> Self {
        SessionMode::Streaming
    }
}

/// Session-wide configuration, separate from the per-transaction request
/// (`TsxData`) and the long-lived wallet credentials.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Streaming vs in-memory input handling (§4.1).
    pub mode: SessionMode,
    /// Whether to run the expensive self-test assertions (range-proof and
    /// MLSAG re-verification) after producing them. Independent of the
    /// build profile so integration tests can force it on in release mode.
    pub self_test: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Streaming,
            self_test: cfg!(debug_assertions),
        }
    }
}
