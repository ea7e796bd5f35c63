//! The capability surface the protocol engine consumes from a ledger:
//! account lookup, transaction submission and debit-history queries.
//!
//! Implementations are thin I/O wrappers with no protocol logic. Every call
//! is a single blocking attempt; failures are terminal and surfaced to the
//! caller with the ledger's structured rejection where one exists.

use std::fmt;

use thiserror::Error;

use crate::crypto::PublicKey;
use crate::ledger::transaction::{TransactionEnvelope, TxHash};
use crate::ledger::Account;

/// Machine-readable rejection codes attached to a failed submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCodes {
    /// The transaction-level code, e.g. `tx_bad_seq`.
    pub transaction: String,
    /// Per-operation codes, e.g. `op_underfunded`.
    pub operations: Vec<String>,
}

/// The ledger's structured rejection of a submitted transaction: detail
/// text, result codes and any extra payloads the endpoint attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejection {
    /// Human-readable rejection detail.
    pub detail: String,
    /// Machine-readable result codes.
    pub result_codes: ResultCodes,
    /// Any extra payloads attached to the rejection.
    pub extras: Vec<String>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.detail)?;
        if !self.result_codes.transaction.is_empty() {
            write!(f, "\nResult codes:\n{}", self.result_codes.transaction)?;
            for code in &self.result_codes.operations {
                write!(f, ", {}", code)?;
            }
        }
        for extra in &self.extras {
            write!(f, "\nExtras:\n{}", extra)?;
        }
        Ok(())
    }
}

/// Errors surfaced by a ledger client.
#[derive(Error, Debug)]
pub enum Error {
    /// An account or transaction lookup failed: unknown address or a failed
    /// client call.
    #[error("Fetch error: {0}")]
    Fetch(String),
    /// The ledger rejected a submitted transaction.
    #[error("Submission rejected: {0}")]
    Rejected(Rejection),
}

/// Acknowledgement of a successfully applied transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    /// Hash of the applied transaction.
    pub hash: TxHash,
}

/// A settled transaction as recorded by the ledger, reduced to what secret
/// extraction needs: its hash and the raw bytes of every attached
/// authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Hash of the settled transaction.
    pub hash: TxHash,
    /// Raw bytes of each recorded authorization, signatures and preimages
    /// alike.
    pub signatures: Vec<Vec<u8>>,
}

/// Client seam towards the ledger network. The engine performs a bounded
/// sequence of strictly ordered calls against this trait; it never caches
/// sequence numbers across steps.
pub trait LedgerClient {
    /// Fetch the current state of an account.
    fn account(&self, id: &PublicKey) -> Result<Account, Error>;

    /// Submit a transaction envelope and wait for the ledger's verdict.
    fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult, Error>;

    /// Return the settled transactions that debited the given account, in
    /// ledger order.
    fn debiting_transactions(&self, id: &PublicKey) -> Result<Vec<TransactionRecord>, Error>;
}
