//! Stellar-style leg of a cross-chain atomic swap.
//!
//! The swap is realized without a scripting language: a per-swap *holding
//! account* is created whose signer/threshold configuration encodes the
//! spending rules. The only two ways to move the escrowed funds are a
//! signature of the counterparty combined with the revealed secret preimage,
//! or a pre-built time-locked refund transaction whose hash is registered as
//! a signer. The [`swap`] module implements the protocol engine; [`ledger`]
//! carries the ledger data model and client seam it runs against.

pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod strkey;
pub mod swap;

use thiserror::Error;

/// A list of possible errors when performing the ledger leg of a cross-chain
/// atomic swap. Each error can have multiple levels down to the wire codec.
#[derive(Error, Debug)]
pub enum Error {
    /// A consensus error during encoding/decoding operations or a data type
    /// mismatch.
    #[error("Consensus error: {0}")]
    Consensus(#[from] consensus::Error),
    /// A cryptographic error during key or secret manipulation, or signature
    /// generation and validation.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] crypto::Error),
    /// A human key encoding error.
    #[error("Strkey error: {0}")]
    Strkey(#[from] strkey::Error),
    /// A transaction construction error.
    #[error("Transaction error: {0}")]
    Transaction(#[from] ledger::transaction::Error),
    /// A ledger client error: account lookup or transaction submission.
    #[error("Ledger client error: {0}")]
    Client(#[from] ledger::client::Error),
    /// An escrow configuration rejected by the contract auditor.
    #[error("Audit error: {0}")]
    Audit(#[from] swap::audit::AuditError),
    /// A failure to recover the secret from settled ledger data.
    #[error("Secret extraction error: {0}")]
    Extraction(#[from] swap::secret::ExtractionError),
}
