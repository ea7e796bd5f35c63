//! End-to-end protocol runs against the in-process ledger: escrow creation,
//! audit, the redeem path, the refund path and secret extraction.

use lazy_static::lazy_static;

use stellar_atomicswap::crypto::{KeyPair, Secret};
use stellar_atomicswap::ledger::client::{Error as ClientError, LedgerClient};
use stellar_atomicswap::ledger::memory::MemoryLedger;
use stellar_atomicswap::ledger::transaction::BASE_FEE;
use stellar_atomicswap::ledger::{Amount, Network};
use stellar_atomicswap::swap::secret::ExtractionError;
use stellar_atomicswap::swap::{
    audit_contract, create_holding_account, extract_secret, redeem, HoldingAccount, SwapRole,
};
use stellar_atomicswap::Error;

const NOW: u64 = 1_700_000_000;

lazy_static! {
    /// The all-zero secret of the protocol's concrete test scenario.
    static ref ZERO_SECRET: Secret = Secret::from_bytes(&[0u8; 32]).unwrap();
}

fn funded_ledger() -> (MemoryLedger, KeyPair, KeyPair) {
    let ledger = MemoryLedger::new(Network::Local);
    ledger.set_time(NOW);
    let initiator = KeyPair::generate();
    let participant = KeyPair::generate();
    ledger.fund(initiator.public_key(), Amount::from_units(100));
    ledger.fund(participant.public_key(), Amount::from_units(100));
    (ledger, initiator, participant)
}

fn initiate(ledger: &MemoryLedger, initiator: &KeyPair, participant: &KeyPair) -> HoldingAccount {
    create_holding_account(
        ledger,
        Network::Local,
        initiator,
        &KeyPair::generate(),
        participant.public_key(),
        "10".parse().unwrap(),
        ZERO_SECRET.hash(),
        SwapRole::Initiator.locktime(NOW),
    )
    .unwrap()
}

fn rejection_code(result: Result<impl std::fmt::Debug, ClientError>) -> String {
    match result {
        Err(ClientError::Rejected(rejection)) => rejection.result_codes.transaction,
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[test]
fn initiate_audit_redeem_extract() {
    let (ledger, initiator, participant) = funded_ledger();
    let escrow = initiate(&ledger, &initiator, &participant);

    // The configured escrow satisfies the signer algebra.
    let account = ledger.account(&escrow.address).unwrap();
    assert_eq!(account.master_weight(), 0);
    assert_eq!(account.thresholds.low, 2);
    assert_eq!(account.thresholds.med, 2);
    assert_eq!(account.thresholds.high, 2);

    // Audit recovers the build parameters: secret hash, counterparty,
    // refund address and a locktime within a second of now + 48h.
    let contract = audit_contract(
        &ledger,
        Network::Local,
        &escrow.address,
        &escrow.refund_transaction,
    )
    .unwrap();
    assert_eq!(contract.secret_hash, ZERO_SECRET.hash());
    assert_eq!(contract.recipient, participant.public_key());
    assert_eq!(contract.refund_address, initiator.public_key());
    assert!(contract.locktime.abs_diff(NOW + 48 * 60 * 60) <= 1);
    // The escrow paid the 4-operation configuration fee out of its balance.
    let config_fee = Amount::from_stroops(4 * BASE_FEE as u64);
    assert_eq!(
        contract.balance,
        Amount::from_units(10).checked_sub(config_fee).unwrap()
    );

    // Nothing has debited the escrow yet.
    match extract_secret(&ledger, &escrow.address, &ZERO_SECRET.hash()) {
        Err(Error::Extraction(ExtractionError::NotYetRedeemed)) => {}
        other => panic!(
            "expected NotYetRedeemed, got {:?}",
            other.map(|s| s.to_string())
        ),
    }

    // The participant redeems with the secret; the escrow terminates.
    redeem(
        &ledger,
        Network::Local,
        &participant,
        escrow.address,
        &ZERO_SECRET,
    )
    .unwrap();
    assert!(ledger.account(&escrow.address).is_err());

    let redeem_fee = Amount::from_stroops(BASE_FEE as u64);
    let expected = Amount::from_units(110)
        .checked_sub(config_fee)
        .unwrap()
        .checked_sub(redeem_fee)
        .unwrap();
    assert_eq!(
        ledger.account(&participant.public_key()).unwrap().balance,
        expected
    );

    // The settled spend reveals the exact secret.
    let recovered = extract_secret(&ledger, &escrow.address, &ZERO_SECRET.hash()).unwrap();
    assert_eq!(recovered, *ZERO_SECRET);
}

#[test]
fn refund_only_after_locktime() {
    let (ledger, participant, initiator) = funded_ledger();
    let locktime = SwapRole::Participant.locktime(NOW);
    let escrow = create_holding_account(
        &ledger,
        Network::Local,
        &participant,
        &KeyPair::generate(),
        initiator.public_key(),
        "10".parse().unwrap(),
        ZERO_SECRET.hash(),
        locktime,
    )
    .unwrap();

    // Too early: the pre-committed refund is time-bounded.
    assert_eq!(
        rejection_code(ledger.submit(&escrow.refund_transaction)),
        "tx_too_early"
    );
    assert!(ledger.account(&escrow.address).is_ok());

    // Once the locktime passes, the bare unsigned transaction goes through
    // purely on the refund-hash commitment signer.
    ledger.set_time(locktime);
    assert!(escrow.refund_transaction.signatures.is_empty());
    ledger.submit(&escrow.refund_transaction).unwrap();
    assert!(ledger.account(&escrow.address).is_err());

    // Escrow creation, configuration and the refund each cost one base fee
    // per operation; everything else flowed back.
    let fees = Amount::from_stroops((1 + 4 + 1) * BASE_FEE as u64);
    assert_eq!(
        ledger.account(&participant.public_key()).unwrap().balance,
        Amount::from_units(100).checked_sub(fees).unwrap()
    );

    // A refund reveals no preimage.
    match extract_secret(&ledger, &escrow.address, &ZERO_SECRET.hash()) {
        Err(Error::Extraction(ExtractionError::PreimageNotFound)) => {}
        other => panic!(
            "expected PreimageNotFound, got {:?}",
            other.map(|s| s.to_string())
        ),
    }
}

#[test]
fn redeem_and_refund_are_mutually_exclusive() {
    let (ledger, initiator, participant) = funded_ledger();
    let escrow = initiate(&ledger, &initiator, &participant);

    redeem(
        &ledger,
        Network::Local,
        &participant,
        escrow.address,
        &ZERO_SECRET,
    )
    .unwrap();

    // The refund can no longer terminate the escrow, even past its
    // locktime: the account is gone.
    ledger.set_time(SwapRole::Initiator.locktime(NOW));
    assert_eq!(
        rejection_code(ledger.submit(&escrow.refund_transaction)),
        "tx_no_source_account"
    );
}

#[test]
fn redeem_requires_both_authorizations() {
    use stellar_atomicswap::ledger::transaction::{Operation, TimeBounds, Transaction};

    let (ledger, initiator, participant) = funded_ledger();
    let escrow = initiate(&ledger, &initiator, &participant);

    let account = ledger.account(&escrow.address).unwrap();
    let merge = Transaction::new(
        escrow.address,
        account.sequence + 1,
        TimeBounds::none(),
        vec![Operation::AccountMerge {
            destination: participant.public_key(),
        }],
    )
    .unwrap();

    // Secret alone reaches weight 1 of 2.
    let mut envelope = merge.clone().into_envelope();
    envelope.sign_hashx(ZERO_SECRET.as_bytes());
    assert_eq!(rejection_code(ledger.submit(&envelope)), "tx_bad_auth");

    // Recipient signature alone reaches weight 1 of 2.
    let mut envelope = merge.clone().into_envelope();
    envelope.sign(Network::Local, &participant);
    assert_eq!(rejection_code(ledger.submit(&envelope)), "tx_bad_auth");

    // The escrow's own key is powerless after configuration.
    let holder_signed = ledger.account(&escrow.address).unwrap();
    assert_eq!(holder_signed.master_weight(), 0);
    assert!(ledger.account(&escrow.address).is_ok());
}

#[test]
fn multiple_debits_are_ambiguous() {
    let (ledger, initiator, participant) = funded_ledger();
    // Two escrow creations debit the initiating account twice; extraction
    // against that account must refuse to guess.
    initiate(&ledger, &initiator, &participant);
    initiate(&ledger, &initiator, &participant);

    match extract_secret(&ledger, &initiator.public_key(), &ZERO_SECRET.hash()) {
        Err(Error::Extraction(ExtractionError::AmbiguousSpend(2))) => {}
        other => panic!(
            "expected AmbiguousSpend, got {:?}",
            other.map(|s| s.to_string())
        ),
    }
}

#[test]
fn audit_is_bound_to_the_network() {
    use stellar_atomicswap::swap::AuditError;

    let (ledger, initiator, participant) = funded_ledger();
    let escrow = initiate(&ledger, &initiator, &participant);

    // Recomputing the refund hash in a foreign network context cannot match
    // the on-chain commitment.
    match audit_contract(
        &ledger,
        Network::Testnet,
        &escrow.address,
        &escrow.refund_transaction,
    ) {
        Err(Error::Audit(AuditError::RefundHashMismatch)) => {}
        other => panic!(
            "expected RefundHashMismatch, got {:?}",
            other.map(|c| c.locktime)
        ),
    }
}
