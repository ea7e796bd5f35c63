//! Recovery of the revealed secret from settled ledger data.

use thiserror::Error as ThisError;

use crate::crypto::{sha256, PublicKey, Secret, SecretHash};
use crate::ledger::client::LedgerClient;
use crate::ledger::transaction::MAX_SIGNATURE_SIZE;
use crate::Error;

/// Ways secret recovery can fail.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No transaction has debited the escrow yet.
    #[error("the holding account has not been redeemed yet")]
    NotYetRedeemed,
    /// More than one transaction debited the escrow. Which one revealed the
    /// secret is deliberately not guessed at; the ambiguity is surfaced.
    #[error("multiple spending transactions found: {0}")]
    AmbiguousSpend(usize),
    /// The settled spend carries no authorization hashing to the target.
    #[error("unable to find the matching secret")]
    PreimageNotFound,
}

/// Scan the single transaction that debited `holding_account` for an
/// authorization whose sha256 digest equals `secret_hash`, and return it as
/// the recovered secret.
///
/// Authorization payloads longer than the ledger's maximum signature size
/// are skipped: they cannot be the 32-byte preimage. This is a size bound
/// only, not a correctness proof; the digest comparison decides.
pub fn extract_secret<C: LedgerClient>(
    client: &C,
    holding_account: &PublicKey,
    secret_hash: &SecretHash,
) -> Result<Secret, Error> {
    let records = client.debiting_transactions(holding_account)?;
    let record = match records.as_slice() {
        [record] => record,
        [] => return Err(ExtractionError::NotYetRedeemed.into()),
        many => return Err(ExtractionError::AmbiguousSpend(many.len()).into()),
    };
    let target = secret_hash.to_string();
    for candidate in &record.signatures {
        if candidate.len() > MAX_SIGNATURE_SIZE {
            continue;
        }
        // The hash travels hex-encoded between the parties; compare in that
        // form.
        if hex::encode(sha256(candidate)) == target {
            return Ok(Secret::from_bytes(candidate)?);
        }
    }
    Err(ExtractionError::PreimageNotFound.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::ledger::client::{
        Error as ClientError, LedgerClient, SubmitResult, TransactionRecord,
    };
    use crate::ledger::transaction::{TransactionEnvelope, TxHash};
    use crate::ledger::Account;

    /// A client canned with debit records only; lookups and submissions are
    /// out of scope here.
    struct CannedDebits(Vec<TransactionRecord>);

    impl LedgerClient for CannedDebits {
        fn account(&self, id: &PublicKey) -> Result<Account, ClientError> {
            Err(ClientError::Fetch(format!("account {} not found", id)))
        }

        fn submit(&self, _: &TransactionEnvelope) -> Result<SubmitResult, ClientError> {
            Err(ClientError::Fetch("submission unsupported".into()))
        }

        fn debiting_transactions(
            &self,
            _: &PublicKey,
        ) -> Result<Vec<TransactionRecord>, ClientError> {
            Ok(self.0.clone())
        }
    }

    fn record(signatures: Vec<Vec<u8>>) -> TransactionRecord {
        TransactionRecord {
            hash: TxHash::from_bytes([9u8; 32]),
            signatures,
        }
    }

    #[test]
    fn recovers_the_preimage() {
        let secret = Secret::from_bytes(&[3u8; 32]).unwrap();
        let client = CannedDebits(vec![record(vec![
            vec![0u8; 64],
            secret.as_bytes().to_vec(),
        ])]);
        let address = KeyPair::generate().public_key();
        let recovered = extract_secret(&client, &address, &secret.hash()).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn oversized_candidates_are_skipped() {
        let secret = Secret::from_bytes(&[3u8; 32]).unwrap();
        // An oversized payload that hashes to the target must not be
        // considered.
        let client = CannedDebits(vec![record(vec![vec![1u8; 65]])]);
        let address = KeyPair::generate().public_key();
        match extract_secret(&client, &address, &secret.hash()) {
            Err(Error::Extraction(ExtractionError::PreimageNotFound)) => {}
            other => panic!("expected PreimageNotFound, got {:?}", other.map(|s| s.hash())),
        }
    }

    #[test]
    fn zero_spends_is_not_yet_redeemed() {
        let client = CannedDebits(vec![]);
        let address = KeyPair::generate().public_key();
        let hash = Secret::from_bytes(&[0u8; 32]).unwrap().hash();
        assert!(matches!(
            extract_secret(&client, &address, &hash),
            Err(Error::Extraction(ExtractionError::NotYetRedeemed))
        ));
    }

    #[test]
    fn multiple_spends_are_ambiguous() {
        let client = CannedDebits(vec![record(vec![]), record(vec![])]);
        let address = KeyPair::generate().public_key();
        let hash = Secret::from_bytes(&[0u8; 32]).unwrap().hash();
        assert!(matches!(
            extract_secret(&client, &address, &hash),
            Err(Error::Extraction(ExtractionError::AmbiguousSpend(2)))
        ));
    }
}
