//! Deterministic in-process ledger.
//!
//! Implements the [`LedgerClient`] seam entirely in memory so the protocol
//! engine can be driven end-to-end without a network: sequence-number and
//! time-bound checks, weighted-threshold evaluation over the three signer
//! kinds, operation application and structured rejection codes. Ledger time
//! only moves when a test moves it.
//!
//! Single-threaded by design, matching the engine's strictly sequential
//! call pattern.

use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::debug;

use crate::crypto::{sha256, PublicKey, Signature};
use crate::ledger::client::{
    Error, LedgerClient, Rejection, ResultCodes, SubmitResult, TransactionRecord,
};
use crate::ledger::transaction::{Operation, ThresholdLevel, TransactionEnvelope, TxHash, BASE_FEE};
use crate::ledger::{Account, Amount, Network, Signer, SignerKey, Thresholds};

#[derive(Debug, Clone)]
struct AccountEntry {
    sequence: i64,
    balance: Amount,
    signers: Vec<Signer>,
    thresholds: Thresholds,
}

#[derive(Debug)]
struct State {
    accounts: BTreeMap<PublicKey, AccountEntry>,
    debits: BTreeMap<PublicKey, Vec<TransactionRecord>>,
    now: u64,
    ledger_count: i64,
}

/// An in-process ledger honoring the account, sequence, time-bound and
/// signer/threshold semantics the swap protocol relies on.
pub struct MemoryLedger {
    network: Network,
    state: RefCell<State>,
}

impl MemoryLedger {
    /// Create an empty ledger for the given network, with time at 0.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            state: RefCell::new(State {
                accounts: BTreeMap::new(),
                debits: BTreeMap::new(),
                now: 0,
                ledger_count: 1,
            }),
        }
    }

    /// The network this ledger validates transaction hashes against.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Current ledger close time in unix seconds.
    pub fn time(&self) -> u64 {
        self.state.borrow().now
    }

    /// Move the ledger close time.
    pub fn set_time(&self, now: u64) {
        self.state.borrow_mut().now = now;
    }

    /// Credit a genesis account, the out-of-band funding every scenario
    /// starts from.
    pub fn fund(&self, id: PublicKey, balance: Amount) {
        let mut state = self.state.borrow_mut();
        let sequence = state.ledger_count << 32;
        state.ledger_count += 1;
        state.accounts.insert(
            id,
            AccountEntry {
                sequence,
                balance,
                signers: vec![Signer {
                    key: SignerKey::Ed25519(id),
                    weight: 1,
                }],
                thresholds: Thresholds {
                    low: 0,
                    med: 0,
                    high: 0,
                },
            },
        );
    }

    fn reject(code: &str, operations: Vec<String>, detail: impl Into<String>) -> Error {
        Error::Rejected(Rejection {
            detail: detail.into(),
            result_codes: ResultCodes {
                transaction: code.into(),
                operations,
            },
            extras: Vec::new(),
        })
    }

    /// Total signer weight the envelope's authorizations reach on the given
    /// signer set. Each signer entry is counted at most once.
    fn signature_weight(hash: &TxHash, signers: &[Signer], envelope: &TransactionEnvelope) -> u32 {
        let mut total = 0u32;
        for signer in signers {
            let satisfied = match &signer.key {
                SignerKey::Ed25519(key) => envelope.signatures.iter().any(|decorated| {
                    <[u8; 64]>::try_from(decorated.signature.as_slice())
                        .map(|bytes| {
                            key.verify(hash.as_bytes(), &Signature::from_bytes(bytes))
                                .is_ok()
                        })
                        .unwrap_or(false)
                }),
                SignerKey::HashX(expected) => envelope
                    .signatures
                    .iter()
                    .any(|decorated| sha256(&decorated.signature) == *expected),
                SignerKey::PreAuthTx(expected) => hash.as_bytes() == expected,
                SignerKey::Unknown { .. } => false,
            };
            if satisfied {
                total += signer.weight as u32;
            }
        }
        total
    }

    fn apply_set_options(
        entry: &mut AccountEntry,
        source: PublicKey,
        master_weight: Option<u8>,
        low: Option<u8>,
        med: Option<u8>,
        high: Option<u8>,
        signer: Option<Signer>,
    ) {
        if let Some(weight) = master_weight {
            let master = SignerKey::Ed25519(source);
            match entry.signers.iter_mut().find(|s| s.key == master) {
                Some(existing) => existing.weight = weight,
                None => entry.signers.push(Signer {
                    key: master,
                    weight,
                }),
            }
        }
        if let Some(low) = low {
            entry.thresholds.low = low;
        }
        if let Some(med) = med {
            entry.thresholds.med = med;
        }
        if let Some(high) = high {
            entry.thresholds.high = high;
        }
        if let Some(signer) = signer {
            // Weight 0 removes the entry; the disabled master key is not
            // touched through this path.
            if signer.weight == 0 {
                entry.signers.retain(|s| s.key != signer.key);
            } else {
                match entry.signers.iter_mut().find(|s| s.key == signer.key) {
                    Some(existing) => existing.weight = signer.weight,
                    None => entry.signers.push(signer),
                }
            }
        }
    }
}

impl LedgerClient for MemoryLedger {
    fn account(&self, id: &PublicKey) -> Result<Account, Error> {
        let state = self.state.borrow();
        let entry = state
            .accounts
            .get(id)
            .ok_or_else(|| Error::Fetch(format!("account {} not found", id)))?;
        Ok(Account {
            id: *id,
            sequence: entry.sequence,
            balance: entry.balance,
            signers: entry.signers.clone(),
            thresholds: entry.thresholds,
        })
    }

    fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult, Error> {
        let mut state = self.state.borrow_mut();
        let tx = &envelope.transaction;
        let hash = envelope.hash(self.network);

        let entry = state
            .accounts
            .get(&tx.source)
            .ok_or_else(|| Self::reject("tx_no_source_account", vec![], "source account missing"))?
            .clone();

        if tx.sequence != entry.sequence + 1 {
            return Err(Self::reject(
                "tx_bad_seq",
                vec![],
                format!(
                    "transaction sequence {} does not follow account sequence {}",
                    tx.sequence, entry.sequence
                ),
            ));
        }
        if state.now < tx.time_bounds.min_time {
            return Err(Self::reject(
                "tx_too_early",
                vec![],
                "the lower time bound has not been reached",
            ));
        }
        if tx.time_bounds.max_time != 0 && state.now > tx.time_bounds.max_time {
            return Err(Self::reject(
                "tx_too_late",
                vec![],
                "the upper time bound has passed",
            ));
        }
        let required_fee = BASE_FEE as u64 * tx.operations.len() as u64;
        if (tx.fee as u64) < required_fee {
            return Err(Self::reject(
                "tx_insufficient_fee",
                vec![],
                "the declared fee does not cover the operations",
            ));
        }
        let fee = Amount::from_stroops(tx.fee as u64);
        if entry.balance < fee {
            return Err(Self::reject(
                "tx_insufficient_balance",
                vec![],
                "the source account cannot pay the fee",
            ));
        }

        let level = tx
            .operations
            .iter()
            .map(Operation::threshold_level)
            .max()
            .unwrap_or(ThresholdLevel::Low);
        let required = match level {
            ThresholdLevel::Low => entry.thresholds.low,
            ThresholdLevel::Medium => entry.thresholds.med,
            ThresholdLevel::High => entry.thresholds.high,
        }
        // A threshold of 0 still requires some valid authorization.
        .max(1) as u32;
        let weight = Self::signature_weight(&hash, &entry.signers, envelope);
        if weight < required {
            return Err(Self::reject(
                "tx_bad_auth",
                vec![],
                format!("signature weight {} below required {}", weight, required),
            ));
        }

        // Included transactions consume the sequence and pay the fee even if
        // their operations fail.
        {
            let entry = state.accounts.get_mut(&tx.source).expect("checked above");
            entry.sequence = tx.sequence;
            entry.balance = entry.balance.checked_sub(fee).expect("checked above");
        }
        state.ledger_count += 1;

        let mut working = state.accounts.clone();
        let mut debited: Vec<PublicKey> = Vec::new();
        for (index, operation) in tx.operations.iter().enumerate() {
            let op_failed = |code: &str| {
                let mut codes = vec!["op_success".to_string(); index];
                codes.push(code.to_string());
                Self::reject("tx_failed", codes, format!("operation {} failed", index))
            };
            match operation {
                Operation::CreateAccount {
                    destination,
                    starting_balance,
                } => {
                    if working.contains_key(destination) {
                        return Err(op_failed("op_already_exists"));
                    }
                    let source = working.get_mut(&tx.source).ok_or_else(|| op_failed("op_no_account"))?;
                    source.balance = source
                        .balance
                        .checked_sub(*starting_balance)
                        .ok_or_else(|| op_failed("op_underfunded"))?;
                    let sequence = state.ledger_count << 32;
                    working.insert(
                        *destination,
                        AccountEntry {
                            sequence,
                            balance: *starting_balance,
                            signers: vec![Signer {
                                key: SignerKey::Ed25519(*destination),
                                weight: 1,
                            }],
                            thresholds: Thresholds {
                                low: 0,
                                med: 0,
                                high: 0,
                            },
                        },
                    );
                    debited.push(tx.source);
                }
                Operation::SetOptions {
                    master_weight,
                    low_threshold,
                    medium_threshold,
                    high_threshold,
                    signer,
                } => {
                    let source = working.get_mut(&tx.source).ok_or_else(|| op_failed("op_no_account"))?;
                    Self::apply_set_options(
                        source,
                        tx.source,
                        *master_weight,
                        *low_threshold,
                        *medium_threshold,
                        *high_threshold,
                        signer.clone(),
                    );
                }
                Operation::AccountMerge { destination } => {
                    if !working.contains_key(destination) {
                        return Err(op_failed("op_no_account"));
                    }
                    let source = working.remove(&tx.source).ok_or_else(|| op_failed("op_no_account"))?;
                    let target = working.get_mut(destination).expect("checked above");
                    target.balance = target
                        .balance
                        .checked_add(source.balance)
                        .ok_or_else(|| op_failed("op_line_full"))?;
                    debited.push(tx.source);
                }
            }
        }

        state.accounts = working;
        let signatures: Vec<Vec<u8>> = envelope
            .signatures
            .iter()
            .map(|decorated| decorated.signature.clone())
            .collect();
        debited.dedup();
        for account in debited {
            state.debits.entry(account).or_default().push(TransactionRecord {
                hash,
                signatures: signatures.clone(),
            });
        }

        debug!(%hash, source = %tx.source, operations = tx.operations.len(), "transaction applied");
        Ok(SubmitResult { hash })
    }

    fn debiting_transactions(&self, id: &PublicKey) -> Result<Vec<TransactionRecord>, Error> {
        let state = self.state.borrow();
        Ok(state.debits.get(id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::ledger::transaction::{TimeBounds, Transaction};

    fn funded_pair(ledger: &MemoryLedger, units: u64) -> KeyPair {
        let pair = KeyPair::generate();
        ledger.fund(pair.public_key(), Amount::from_units(units));
        pair
    }

    #[test]
    fn sequence_is_enforced() {
        let ledger = MemoryLedger::new(Network::Local);
        let source = funded_pair(&ledger, 100);
        let destination = KeyPair::generate();
        let account = ledger.account(&source.public_key()).unwrap();
        let tx = Transaction::new(
            source.public_key(),
            account.sequence + 2,
            TimeBounds::none(),
            vec![Operation::CreateAccount {
                destination: destination.public_key(),
                starting_balance: Amount::from_units(10),
            }],
        )
        .unwrap();
        let mut envelope = tx.into_envelope();
        envelope.sign(Network::Local, &source);
        match ledger.submit(&envelope) {
            Err(Error::Rejected(rejection)) => {
                assert_eq!(rejection.result_codes.transaction, "tx_bad_seq")
            }
            other => panic!("expected tx_bad_seq, got {:?}", other.map(|r| r.hash)),
        }
    }

    #[test]
    fn unsigned_transactions_are_rejected() {
        let ledger = MemoryLedger::new(Network::Local);
        let source = funded_pair(&ledger, 100);
        let destination = KeyPair::generate();
        let account = ledger.account(&source.public_key()).unwrap();
        let envelope = Transaction::new(
            source.public_key(),
            account.sequence + 1,
            TimeBounds::none(),
            vec![Operation::AccountMerge {
                destination: destination.public_key(),
            }],
        )
        .unwrap()
        .into_envelope();
        match ledger.submit(&envelope) {
            Err(Error::Rejected(rejection)) => {
                assert_eq!(rejection.result_codes.transaction, "tx_bad_auth")
            }
            other => panic!("expected tx_bad_auth, got {:?}", other.map(|r| r.hash)),
        }
    }

    #[test]
    fn create_and_merge_move_balances() {
        let ledger = MemoryLedger::new(Network::Local);
        let source = funded_pair(&ledger, 100);
        let escrow = KeyPair::generate();

        let account = ledger.account(&source.public_key()).unwrap();
        let tx = Transaction::new(
            source.public_key(),
            account.sequence + 1,
            TimeBounds::none(),
            vec![Operation::CreateAccount {
                destination: escrow.public_key(),
                starting_balance: Amount::from_units(10),
            }],
        )
        .unwrap();
        let mut envelope = tx.into_envelope();
        envelope.sign(Network::Local, &source);
        ledger.submit(&envelope).unwrap();

        let escrow_account = ledger.account(&escrow.public_key()).unwrap();
        assert_eq!(escrow_account.balance, Amount::from_units(10));

        let tx = Transaction::new(
            escrow.public_key(),
            escrow_account.sequence + 1,
            TimeBounds::none(),
            vec![Operation::AccountMerge {
                destination: source.public_key(),
            }],
        )
        .unwrap();
        let mut envelope = tx.into_envelope();
        envelope.sign(Network::Local, &escrow);
        ledger.submit(&envelope).unwrap();

        assert!(ledger.account(&escrow.public_key()).is_err());
        let records = ledger
            .debiting_transactions(&escrow.public_key())
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn time_bounds_are_enforced() {
        let ledger = MemoryLedger::new(Network::Local);
        ledger.set_time(1_000);
        let source = funded_pair(&ledger, 100);
        let destination = funded_pair(&ledger, 1);
        let account = ledger.account(&source.public_key()).unwrap();
        let tx = Transaction::new(
            source.public_key(),
            account.sequence + 1,
            TimeBounds::after(2_000),
            vec![Operation::AccountMerge {
                destination: destination.public_key(),
            }],
        )
        .unwrap();
        let mut envelope = tx.into_envelope();
        envelope.sign(Network::Local, &source);
        match ledger.submit(&envelope) {
            Err(Error::Rejected(rejection)) => {
                assert_eq!(rejection.result_codes.transaction, "tx_too_early")
            }
            other => panic!("expected tx_too_early, got {:?}", other.map(|r| r.hash)),
        }
        ledger.set_time(2_000);
        assert!(ledger.submit(&envelope).is_ok());
    }
}
