//! On-chain verification of a counterparty's escrow configuration.
//!
//! This is the check a party runs before funding their own leg, and the
//! primary defense against malicious escrows: any deviation from the agreed
//! signer algebra is rejected with the precise violation. The audit only
//! reads from the ledger, it never mutates state.

use thiserror::Error as ThisError;

use crate::crypto::{PublicKey, SecretHash};
use crate::ledger::client::LedgerClient;
use crate::ledger::transaction::{Operation, TransactionEnvelope};
use crate::ledger::{Amount, Network, SignerKey};
use crate::swap::{RECIPIENT_WEIGHT, REFUND_WEIGHT, SECRET_WEIGHT, SPENDING_THRESHOLD};
use crate::Error;

/// Ways an escrow configuration can deviate from the protocol invariants.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The three thresholds are not all set to the spending threshold.
    #[error(
        "holding account signing thresholds are wrong: high {high}, medium {med}, low {low}"
    )]
    ThresholdMismatch {
        /// The low threshold found on-chain.
        low: u8,
        /// The medium threshold found on-chain.
        med: u8,
        /// The high threshold found on-chain.
        high: u8,
    },
    /// A signer role appears more than once.
    #[error("multiple {0} signers")]
    DuplicateSigner(&'static str),
    /// A signer role carries the wrong weight.
    #[error("signing weight {weight} of the {role} signer is wrong")]
    WeightMismatch {
        /// The role whose weight is off.
        role: &'static str,
        /// The weight found on-chain.
        weight: u8,
    },
    /// A required signer role is absent.
    #[error("missing {0} signer")]
    MissingSigner(&'static str),
    /// A signer of a kind this protocol does not use is present.
    #[error("unexpected signer type: {0}")]
    UnknownSignerType(String),
    /// The supplied refund transaction does not hash to the on-chain
    /// commitment.
    #[error(
        "refund transaction hash in the signing conditions does not match the supplied refund transaction"
    )]
    RefundHashMismatch,
    /// The supplied refund transaction has the wrong shape.
    #[error("malformed refund transaction: {0}")]
    MalformedRefundTransaction(&'static str),
}

/// The public parameters recovered from a correctly configured escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    /// The escrow account's address.
    pub holding_account: PublicKey,
    /// The escrow's current native balance.
    pub balance: Amount,
    /// The address allowed to redeem with the secret.
    pub recipient: PublicKey,
    /// The address the refund transaction merges back to.
    pub refund_address: PublicKey,
    /// The secret-hash commitment installed on the escrow.
    pub secret_hash: SecretHash,
    /// Earliest time (unix seconds) the refund transaction becomes valid.
    pub locktime: u64,
}

/// Verify that the escrow at `holding_account` encodes exactly the agreed
/// protocol and recover its public parameters.
///
/// The claimed refund transaction is re-hashed in this network context and
/// must match the on-chain refund-hash commitment byte for byte; its shape
/// must be a single account-merge spending from the escrow.
pub fn audit_contract<C: LedgerClient>(
    client: &C,
    network: Network,
    holding_account: &PublicKey,
    refund_transaction: &TransactionEnvelope,
) -> Result<Contract, Error> {
    let account = client.account(holding_account)?;

    let thresholds = account.thresholds;
    if thresholds.low != SPENDING_THRESHOLD
        || thresholds.med != SPENDING_THRESHOLD
        || thresholds.high != SPENDING_THRESHOLD
    {
        return Err(AuditError::ThresholdMismatch {
            low: thresholds.low,
            med: thresholds.med,
            high: thresholds.high,
        }
        .into());
    }

    let mut recipient: Option<PublicKey> = None;
    let mut refund_commitment: Option<[u8; 32]> = None;
    let mut secret_commitment: Option<[u8; 32]> = None;
    for signer in &account.signers {
        // The disabled master key keeps its entry at weight 0.
        if signer.weight == 0 {
            continue;
        }
        match &signer.key {
            SignerKey::Ed25519(key) => {
                if recipient.is_some() {
                    return Err(AuditError::DuplicateSigner("recipient").into());
                }
                if signer.weight != RECIPIENT_WEIGHT {
                    return Err(AuditError::WeightMismatch {
                        role: "recipient",
                        weight: signer.weight,
                    }
                    .into());
                }
                recipient = Some(*key);
            }
            SignerKey::PreAuthTx(hash) => {
                if refund_commitment.is_some() {
                    return Err(AuditError::DuplicateSigner("refund transaction hash").into());
                }
                if signer.weight != REFUND_WEIGHT {
                    return Err(AuditError::WeightMismatch {
                        role: "refund transaction hash",
                        weight: signer.weight,
                    }
                    .into());
                }
                refund_commitment = Some(*hash);
            }
            SignerKey::HashX(hash) => {
                if secret_commitment.is_some() {
                    return Err(AuditError::DuplicateSigner("secret hash").into());
                }
                if signer.weight != SECRET_WEIGHT {
                    return Err(AuditError::WeightMismatch {
                        role: "secret hash",
                        weight: signer.weight,
                    }
                    .into());
                }
                secret_commitment = Some(*hash);
            }
            SignerKey::Unknown { type_name, .. } => {
                return Err(AuditError::UnknownSignerType(type_name.clone()).into());
            }
        }
    }
    let refund_commitment =
        refund_commitment.ok_or(AuditError::MissingSigner("refund transaction hash"))?;
    let secret_commitment = secret_commitment.ok_or(AuditError::MissingSigner("secret hash"))?;
    let recipient = recipient.ok_or(AuditError::MissingSigner("recipient"))?;

    if refund_transaction.hash(network).as_bytes() != &refund_commitment {
        return Err(AuditError::RefundHashMismatch.into());
    }

    let transaction = &refund_transaction.transaction;
    if transaction.operations.len() != 1 {
        return Err(
            AuditError::MalformedRefundTransaction("expected exactly one operation").into(),
        );
    }
    let refund_address = match &transaction.operations[0] {
        Operation::AccountMerge { destination } => *destination,
        Operation::CreateAccount { .. } | Operation::SetOptions { .. } => {
            return Err(AuditError::MalformedRefundTransaction(
                "expected an account-merge operation",
            )
            .into());
        }
    };
    if transaction.source != *holding_account {
        return Err(AuditError::MalformedRefundTransaction(
            "does not spend from the holding account",
        )
        .into());
    }

    Ok(Contract {
        holding_account: *holding_account,
        balance: account.balance,
        recipient,
        refund_address,
        secret_hash: SecretHash::from_bytes(secret_commitment),
        locktime: transaction.time_bounds.min_time,
    })
}
