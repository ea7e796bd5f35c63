//! Audit rejection of tampered escrow configurations and tampered refund
//! transactions. Every deviation from the signer algebra must surface the
//! matching violation, never a silent accept.

use stellar_atomicswap::crypto::{KeyPair, PublicKey, Secret, SecretHash};
use stellar_atomicswap::ledger::client::{
    Error as ClientError, LedgerClient, SubmitResult, TransactionRecord,
};
use stellar_atomicswap::ledger::transaction::{
    Operation, TimeBounds, Transaction, TransactionEnvelope, TxHash,
};
use stellar_atomicswap::ledger::{Account, Amount, Network, Signer, SignerKey, Thresholds};
use stellar_atomicswap::swap::{audit_contract, AuditError};
use stellar_atomicswap::Error;

/// Serves one handcrafted account state; audits only read.
struct StaticLedger(Account);

impl LedgerClient for StaticLedger {
    fn account(&self, id: &PublicKey) -> Result<Account, ClientError> {
        if *id == self.0.id {
            Ok(self.0.clone())
        } else {
            Err(ClientError::Fetch(format!("account {} not found", id)))
        }
    }

    fn submit(&self, _: &TransactionEnvelope) -> Result<SubmitResult, ClientError> {
        Err(ClientError::Fetch("read-only ledger".into()))
    }

    fn debiting_transactions(
        &self,
        _: &PublicKey,
    ) -> Result<Vec<TransactionRecord>, ClientError> {
        Ok(Vec::new())
    }
}

struct Fixture {
    escrow: PublicKey,
    recipient: PublicKey,
    refund_to: PublicKey,
    secret_hash: SecretHash,
    refund: TransactionEnvelope,
    account: Account,
}

/// A correctly configured escrow and its matching refund transaction.
fn fixture() -> Fixture {
    let escrow = KeyPair::generate().public_key();
    let recipient = KeyPair::generate().public_key();
    let refund_to = KeyPair::generate().public_key();
    let secret_hash = Secret::from_bytes(&[7u8; 32]).unwrap().hash();
    let refund = Transaction::new(
        escrow,
        (1 << 32) + 2,
        TimeBounds::after(1_700_086_400),
        vec![Operation::AccountMerge {
            destination: refund_to,
        }],
    )
    .unwrap();
    let account = escrow_account(escrow, recipient, secret_hash, refund.hash(Network::Local));
    Fixture {
        escrow,
        recipient,
        refund_to,
        secret_hash,
        refund: refund.into_envelope(),
        account,
    }
}

fn escrow_account(
    escrow: PublicKey,
    recipient: PublicKey,
    secret_hash: SecretHash,
    refund_hash: TxHash,
) -> Account {
    Account {
        id: escrow,
        sequence: (1 << 32) + 1,
        balance: Amount::from_units(10),
        signers: vec![
            // The disabled master key stays listed at weight 0.
            Signer {
                key: SignerKey::Ed25519(escrow),
                weight: 0,
            },
            Signer {
                key: SignerKey::Ed25519(recipient),
                weight: 1,
            },
            Signer {
                key: SignerKey::HashX(*secret_hash.as_bytes()),
                weight: 1,
            },
            Signer {
                key: SignerKey::PreAuthTx(*refund_hash.as_bytes()),
                weight: 2,
            },
        ],
        thresholds: Thresholds {
            low: 2,
            med: 2,
            high: 2,
        },
    }
}

fn audit_error(account: Account, refund: &TransactionEnvelope) -> AuditError {
    let escrow = account.id;
    match audit_contract(&StaticLedger(account), Network::Local, &escrow, refund) {
        Err(Error::Audit(err)) => err,
        other => panic!(
            "expected an audit error, got {:?}",
            other.map(|c| c.locktime)
        ),
    }
}

#[test]
fn well_formed_contract_is_accepted() {
    let fixture = fixture();
    let contract = audit_contract(
        &StaticLedger(fixture.account),
        Network::Local,
        &fixture.escrow,
        &fixture.refund,
    )
    .unwrap();
    assert_eq!(contract.holding_account, fixture.escrow);
    assert_eq!(contract.balance, Amount::from_units(10));
    assert_eq!(contract.recipient, fixture.recipient);
    assert_eq!(contract.refund_address, fixture.refund_to);
    assert_eq!(contract.secret_hash, fixture.secret_hash);
    assert_eq!(contract.locktime, 1_700_086_400);
}

#[test]
fn wrong_thresholds_are_rejected() {
    let mut fixture = fixture();
    fixture.account.thresholds.med = 1;
    assert_eq!(
        audit_error(fixture.account, &fixture.refund),
        AuditError::ThresholdMismatch {
            low: 2,
            med: 1,
            high: 2
        }
    );
}

#[test]
fn wrong_signer_weights_are_rejected() {
    for (index, role) in [
        (1, "recipient"),
        (2, "secret hash"),
        (3, "refund transaction hash"),
    ] {
        let mut fixture = fixture();
        let wrong = fixture.account.signers[index].weight + 1;
        fixture.account.signers[index].weight = wrong;
        assert_eq!(
            audit_error(fixture.account, &fixture.refund),
            AuditError::WeightMismatch { role, weight: wrong }
        );
    }
}

#[test]
fn duplicate_signers_are_rejected() {
    let mut fixture1 = fixture();
    fixture1.account.signers.push(Signer {
        key: SignerKey::Ed25519(KeyPair::generate().public_key()),
        weight: 1,
    });
    assert_eq!(
        audit_error(fixture1.account, &fixture1.refund),
        AuditError::DuplicateSigner("recipient")
    );

    let mut fixture2 = fixture();
    fixture2.account.signers.push(Signer {
        key: SignerKey::HashX([13u8; 32]),
        weight: 1,
    });
    assert_eq!(
        audit_error(fixture2.account, &fixture2.refund),
        AuditError::DuplicateSigner("secret hash")
    );

    let mut fixture3 = fixture();
    fixture3.account.signers.push(Signer {
        key: SignerKey::PreAuthTx([13u8; 32]),
        weight: 2,
    });
    assert_eq!(
        audit_error(fixture3.account, &fixture3.refund),
        AuditError::DuplicateSigner("refund transaction hash")
    );
}

#[test]
fn missing_signers_are_rejected() {
    // Removal order matters: the refund commitment is checked for first.
    for (index, role) in [
        (3, "refund transaction hash"),
        (2, "secret hash"),
        (1, "recipient"),
    ] {
        let mut fixture = fixture();
        fixture.account.signers.remove(index);
        assert_eq!(
            audit_error(fixture.account, &fixture.refund),
            AuditError::MissingSigner(role)
        );
    }
}

#[test]
fn unknown_signer_kinds_are_rejected() {
    let mut fixture = fixture();
    fixture.account.signers.push(Signer {
        key: SignerKey::Unknown {
            type_name: "sha512_hash".into(),
            key: "ZFAKE".into(),
        },
        weight: 1,
    });
    assert_eq!(
        audit_error(fixture.account, &fixture.refund),
        AuditError::UnknownSignerType("sha512_hash".into())
    );
}

#[test]
fn tampered_refund_transaction_is_rejected() {
    // Any single changed field of the claimed refund transaction breaks the
    // byte-equality with the on-chain commitment.
    let fixture_base = fixture();

    let mut tampered = fixture_base.refund.clone();
    tampered.transaction.sequence += 1;
    assert_eq!(
        audit_error(fixture_base.account.clone(), &tampered),
        AuditError::RefundHashMismatch
    );

    let mut tampered = fixture_base.refund.clone();
    tampered.transaction.time_bounds.min_time -= 1;
    assert_eq!(
        audit_error(fixture_base.account.clone(), &tampered),
        AuditError::RefundHashMismatch
    );

    let mut tampered = fixture_base.refund.clone();
    tampered.transaction.operations = vec![Operation::AccountMerge {
        destination: KeyPair::generate().public_key(),
    }];
    assert_eq!(
        audit_error(fixture_base.account, &tampered),
        AuditError::RefundHashMismatch
    );
}

#[test]
fn refund_with_extra_operations_is_rejected() {
    let fixture = fixture();
    let destination = fixture.refund_to;
    let two_merges = Transaction::new(
        fixture.escrow,
        (1 << 32) + 2,
        TimeBounds::after(1_700_086_400),
        vec![
            Operation::AccountMerge { destination },
            Operation::AccountMerge { destination },
        ],
    )
    .unwrap();
    // The escrow commits to exactly this malformed transaction, so only the
    // shape check can catch it.
    let account = escrow_account(
        fixture.escrow,
        fixture.recipient,
        fixture.secret_hash,
        two_merges.hash(Network::Local),
    );
    assert_eq!(
        audit_error(account, &two_merges.into_envelope()),
        AuditError::MalformedRefundTransaction("expected exactly one operation")
    );
}

#[test]
fn refund_without_account_merge_is_rejected() {
    let fixture = fixture();
    let not_a_merge = Transaction::new(
        fixture.escrow,
        (1 << 32) + 2,
        TimeBounds::after(1_700_086_400),
        vec![Operation::CreateAccount {
            destination: fixture.refund_to,
            starting_balance: Amount::from_units(10),
        }],
    )
    .unwrap();
    let account = escrow_account(
        fixture.escrow,
        fixture.recipient,
        fixture.secret_hash,
        not_a_merge.hash(Network::Local),
    );
    assert_eq!(
        audit_error(account, &not_a_merge.into_envelope()),
        AuditError::MalformedRefundTransaction("expected an account-merge operation")
    );
}

#[test]
fn refund_from_foreign_account_is_rejected() {
    let fixture = fixture();
    let foreign = Transaction::new(
        KeyPair::generate().public_key(),
        (1 << 32) + 2,
        TimeBounds::after(1_700_086_400),
        vec![Operation::AccountMerge {
            destination: fixture.refund_to,
        }],
    )
    .unwrap();
    let account = escrow_account(
        fixture.escrow,
        fixture.recipient,
        fixture.secret_hash,
        foreign.hash(Network::Local),
    );
    assert_eq!(
        audit_error(account, &foreign.into_envelope()),
        AuditError::MalformedRefundTransaction("does not spend from the holding account")
    );
}
