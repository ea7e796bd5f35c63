//! Construction of the time-locked refund path.

use crate::crypto::PublicKey;
use crate::ledger::transaction::{
    Error, Operation, TimeBounds, Transaction, TransactionEnvelope, TxHash,
};
use crate::ledger::{Account, Network};

/// Build the refund transaction for an escrow: a single account-merge of
/// the escrow's full balance back to `refund_to`, valid from `locktime` on
/// with no upper bound.
///
/// The transaction is bound to the sequence slot *after* the one the
/// configuration transaction consumes: the escrow state passed in is
/// fetched before configuration, so the reservation is `sequence + 2`. The
/// transaction is fully built but never submitted here; only its hash is
/// registered in the escrow's signer set, and the bytes are handed to the
/// counterparty so they can verify the hash independently and resubmit the
/// transaction once the locktime has passed. No signature is ever attached:
/// submission succeeds purely through the escrow's refund-hash commitment
/// signer.
pub fn build_refund_transaction(
    escrow: &Account,
    refund_to: PublicKey,
    locktime: u64,
    network: Network,
) -> Result<(TransactionEnvelope, TxHash), Error> {
    let sequence = escrow
        .sequence
        .checked_add(2)
        .ok_or(Error::SequenceOverflow)?;
    let transaction = Transaction::new(
        escrow.id,
        sequence,
        TimeBounds::after(locktime),
        vec![Operation::AccountMerge {
            destination: refund_to,
        }],
    )?;
    let hash = transaction.hash(network);
    Ok((transaction.into_envelope(), hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::ledger::{Amount, Signer, SignerKey, Thresholds};

    fn escrow_account(sequence: i64) -> Account {
        let id = KeyPair::generate().public_key();
        Account {
            id,
            sequence,
            balance: Amount::from_units(10),
            signers: vec![Signer {
                key: SignerKey::Ed25519(id),
                weight: 1,
            }],
            thresholds: Thresholds {
                low: 0,
                med: 0,
                high: 0,
            },
        }
    }

    #[test]
    fn reserves_the_slot_after_configuration() {
        let escrow = escrow_account(1 << 32);
        let refund_to = KeyPair::generate().public_key();
        let (envelope, _) =
            build_refund_transaction(&escrow, refund_to, 500, Network::Local).unwrap();
        assert_eq!(envelope.transaction.sequence, (1 << 32) + 2);
    }

    #[test]
    fn lower_bound_only() {
        let escrow = escrow_account(7);
        let refund_to = KeyPair::generate().public_key();
        let (envelope, hash) =
            build_refund_transaction(&escrow, refund_to, 123_456, Network::Local).unwrap();
        assert_eq!(envelope.transaction.time_bounds.min_time, 123_456);
        assert_eq!(envelope.transaction.time_bounds.max_time, 0);
        assert!(envelope.signatures.is_empty());
        assert_eq!(envelope.hash(Network::Local), hash);
    }

    #[test]
    fn sequence_overflow_is_surfaced() {
        let escrow = escrow_account(i64::MAX - 1);
        let refund_to = KeyPair::generate().public_key();
        assert!(matches!(
            build_refund_transaction(&escrow, refund_to, 0, Network::Local),
            Err(Error::SequenceOverflow)
        ));
    }
}
