// Copyright (c) 2018-2022 The Botho Foundation

//! The transaction state machine: each RPC-style call on [`crate::session::SignerSession`]
//! is legal only from specific phases, exactly mirroring the reference
//! implementation's integer-and-raise discipline, just spelled as an enum
//! match instead of a bare integer.

/// The current phase of a signing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TState {
    /// 0: nothing has happened yet.
    Start,
    /// 1: `init_transaction` has run.
    Init,
    /// 2: subaddresses have been precomputed.
    Precomputed,
    /// 3: the input count has been declared.
    InputCountSet,
    /// 4: one or more inputs have been ingested.
    InputsPartial,
    /// 5: all declared inputs have been ingested.
    InputsDone,
    /// 6: the Host's key-image permutation has been applied.
    InputsPermuted,
    /// 7: some permuted vins have been replayed back for re-authentication.
    InputVinsPartial,
    /// 8: every permuted vin has been replayed and verified.
    InputVinsDone,
    /// 9: one or more outputs have been processed.
    OutputsPartial,
    /// 10: every declared output has been processed.
    OutputsDone,
    /// 11: one or more pseudo-outs have been absorbed.
    PseudoOutsPartial,
    /// 12: one or more range proofs have been absorbed.
    RangeProofsPartial,
    /// 13: the full message has been finalized.
    FinalMessageDone,
    /// 14: at least one input has been MLSAG-signed.
    Signed,
}

impl TState {
    /// The state immediately after construction, before `init_transaction`.
    pub fn start() -> Self {
        TState::Start
    }
}
