//! Construction and submission of the redeem transaction.

use tracing::debug;

use crate::crypto::{KeyPair, PublicKey, Secret};
use crate::ledger::client::{LedgerClient, SubmitResult};
use crate::ledger::transaction::{
    Error as TransactionError, Operation, TimeBounds, Transaction,
};
use crate::ledger::Network;
use crate::Error;

/// Merge the escrowed funds to `receiver`, revealing `secret` on the ledger
/// in the process.
///
/// The transaction carries no time bounds and two authorizations: the raw
/// secret bytes satisfying the secret-hash commitment signer, and the
/// receiver's signature satisfying the recipient signer. Their combined
/// weight meets the spending threshold; the order in which they are
/// attached is irrelevant to validity, both must be present.
pub fn redeem<C: LedgerClient>(
    client: &C,
    network: Network,
    receiver: &KeyPair,
    holding_account: PublicKey,
    secret: &Secret,
) -> Result<SubmitResult, Error> {
    let account = client.account(&holding_account)?;
    let transaction = Transaction::new(
        holding_account,
        account
            .sequence
            .checked_add(1)
            .ok_or(TransactionError::SequenceOverflow)?,
        TimeBounds::none(),
        vec![Operation::AccountMerge {
            destination: receiver.public_key(),
        }],
    )?;
    let mut envelope = transaction.into_envelope();
    envelope.sign_hashx(secret.as_bytes());
    envelope.sign(network, receiver);
    let result = client.submit(&envelope)?;
    debug!(escrow = %holding_account, hash = %result.hash, "escrow redeemed");
    Ok(result)
}
