//! Creation and configuration of the escrow ("holding") account.

use tracing::debug;

use crate::crypto::{KeyPair, PublicKey, SecretHash};
use crate::ledger::client::LedgerClient;
use crate::ledger::transaction::{
    Error as TransactionError, Operation, TimeBounds, Transaction, TransactionEnvelope, TxHash,
};
use crate::ledger::{Amount, Network, Signer, SignerKey};
use crate::swap::refund::build_refund_transaction;
use crate::swap::{RECIPIENT_WEIGHT, REFUND_WEIGHT, SECRET_WEIGHT, SPENDING_THRESHOLD};
use crate::Error;

/// The outcome of building an escrow: its address plus the refund path the
/// counterparty needs for verification and, after the locktime, recovery.
#[derive(Debug, Clone)]
pub struct HoldingAccount {
    /// The escrow account's address.
    pub address: PublicKey,
    /// The pre-built, unsigned refund transaction.
    pub refund_transaction: TransactionEnvelope,
    /// Hash of the refund transaction, as registered in the signer set.
    pub refund_hash: TxHash,
}

/// Create an escrow holding `amount`, spendable either by `counterparty`
/// together with the preimage of `secret_hash`, or through the returned
/// refund transaction once `locktime` (unix seconds) has passed.
///
/// Steps run strictly in order and every failure is terminal: fund the
/// account from `funding`, re-fetch it, build the refund path against its
/// fresh sequence number, then install the signer configuration in a single
/// transaction. Signing that configuration is the only legitimate use of
/// the `holding` keypair; once it is applied the escrow's own key is
/// permanently powerless.
#[allow(clippy::too_many_arguments)]
pub fn create_holding_account<C: LedgerClient>(
    client: &C,
    network: Network,
    funding: &KeyPair,
    holding: &KeyPair,
    counterparty: PublicKey,
    amount: Amount,
    secret_hash: SecretHash,
    locktime: u64,
) -> Result<HoldingAccount, Error> {
    let address = holding.public_key();

    let funding_account = client.account(&funding.public_key())?;
    let create = Transaction::new(
        funding.public_key(),
        funding_account
            .sequence
            .checked_add(1)
            .ok_or(TransactionError::SequenceOverflow)?,
        TimeBounds::none(),
        vec![Operation::CreateAccount {
            destination: address,
            starting_balance: amount,
        }],
    )?;
    let mut create = create.into_envelope();
    create.sign(network, funding);
    client.submit(&create)?;
    debug!(escrow = %address, %amount, "holding account created");

    // The refund path must bind to the account's post-creation sequence, so
    // the account is re-fetched rather than derived.
    let escrow_account = client.account(&address)?;
    let (refund_transaction, refund_hash) =
        build_refund_transaction(&escrow_account, funding.public_key(), locktime, network)?;

    // All four conditions are installed atomically. A partially configured
    // escrow would admit an unintended spending path, e.g. a still-live
    // master key.
    let configure = Transaction::new(
        address,
        escrow_account
            .sequence
            .checked_add(1)
            .ok_or(TransactionError::SequenceOverflow)?,
        TimeBounds::none(),
        vec![
            Operation::add_signer(Signer {
                key: SignerKey::Ed25519(counterparty),
                weight: RECIPIENT_WEIGHT,
            }),
            Operation::add_signer(Signer {
                key: SignerKey::HashX(*secret_hash.as_bytes()),
                weight: SECRET_WEIGHT,
            }),
            Operation::add_signer(Signer {
                key: SignerKey::PreAuthTx(*refund_hash.as_bytes()),
                weight: REFUND_WEIGHT,
            }),
            Operation::SetOptions {
                master_weight: Some(0),
                low_threshold: Some(SPENDING_THRESHOLD),
                medium_threshold: Some(SPENDING_THRESHOLD),
                high_threshold: Some(SPENDING_THRESHOLD),
                signer: None,
            },
        ],
    )?;
    let mut configure = configure.into_envelope();
    configure.sign(network, holding);
    client.submit(&configure)?;
    debug!(escrow = %address, locktime, "holding account configured");

    Ok(HoldingAccount {
        address,
        refund_transaction,
        refund_hash,
    })
}
