//! Thin blocking client for a horizon-style ledger REST API.
//!
//! Pure I/O: account detail, form-encoded transaction submission, and the
//! effects → operation → transaction walk recovering the transactions that
//! debited an account. No protocol logic lives here; every call is a single
//! blocking attempt whose failure is surfaced unchanged.

use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use base64::Engine as _;

use crate::crypto::PublicKey;
use crate::ledger::client::{
    Error, LedgerClient, Rejection, ResultCodes, SubmitResult, TransactionRecord,
};
use crate::ledger::transaction::{TransactionEnvelope, TxHash};
use crate::ledger::{Account, Amount, Network, Signer, SignerKey, Thresholds};
use crate::strkey;

/// Blocking client against a horizon-style endpoint.
pub struct HorizonClient {
    base: String,
    http: HttpClient,
}

impl HorizonClient {
    /// Create a client for an explicit endpoint.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            http: HttpClient::new(),
        }
    }

    /// Create a client for the network's well-known public endpoint.
    pub fn for_network(network: Network) -> Self {
        Self::new(match network {
            Network::Mainnet => "https://horizon.stellar.org",
            Network::Testnet => "https://horizon-testnet.stellar.org",
            Network::Local => "http://localhost:8000",
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| Error::Fetch(err.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        response.json().map_err(|err| Error::Fetch(err.to_string()))
    }
}

#[derive(Deserialize)]
struct RawAccount {
    sequence: String,
    balances: Vec<RawBalance>,
    signers: Vec<RawSigner>,
    thresholds: RawThresholds,
}

#[derive(Deserialize)]
struct RawBalance {
    asset_type: String,
    balance: Amount,
}

#[derive(Deserialize)]
struct RawSigner {
    key: String,
    #[serde(rename = "type")]
    kind: String,
    weight: u8,
}

#[derive(Deserialize)]
struct RawThresholds {
    low_threshold: u8,
    med_threshold: u8,
    high_threshold: u8,
}

#[derive(Deserialize)]
struct RawSubmitted {
    hash: String,
}

#[derive(Deserialize, Default)]
struct RawProblem {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extras: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize, Default)]
struct RawResultCodes {
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    operations: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawPage<T> {
    #[serde(rename = "_embedded")]
    embedded: RawRecords<T>,
}

#[derive(Deserialize)]
struct RawRecords<T> {
    records: Vec<T>,
}

#[derive(Deserialize)]
struct RawEffect {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "_links")]
    links: RawEffectLinks,
}

#[derive(Deserialize)]
struct RawEffectLinks {
    operation: RawHref,
}

#[derive(Deserialize)]
struct RawHref {
    href: String,
}

#[derive(Deserialize)]
struct RawOperation {
    transaction_hash: String,
}

#[derive(Deserialize)]
struct RawTransaction {
    hash: String,
    signatures: Vec<String>,
}

/// Map a reported signer onto the protocol's tagged union. Kinds or keys
/// this protocol does not understand come back as [`SignerKey::Unknown`]
/// and are rejected downstream, never dropped.
fn signer_key(kind: &str, key: &str) -> SignerKey {
    let parsed = match kind {
        "ed25519_public_key" => key.parse::<PublicKey>().map(SignerKey::Ed25519).ok(),
        "sha256_hash" => strkey::decode(strkey::Version::Sha256Hash, key)
            .map(SignerKey::HashX)
            .ok(),
        "preauth_tx" => strkey::decode(strkey::Version::PreAuthTx, key)
            .map(SignerKey::PreAuthTx)
            .ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| SignerKey::Unknown {
        type_name: kind.to_string(),
        key: key.to_string(),
    })
}

fn rejection(problem: RawProblem) -> Rejection {
    let mut result_codes = ResultCodes::default();
    let mut extras = Vec::new();
    if let Some(map) = problem.extras {
        for (name, value) in map {
            if name == "result_codes" {
                let codes: RawResultCodes =
                    serde_json::from_value(value).unwrap_or_default();
                result_codes.transaction = codes.transaction.unwrap_or_default();
                result_codes.operations = codes.operations.unwrap_or_default();
            } else {
                extras.push(format!("{}: {}", name, value));
            }
        }
    }
    Rejection {
        detail: problem
            .detail
            .or(problem.title)
            .unwrap_or_else(|| "transaction submission failed".to_string()),
        result_codes,
        extras,
    }
}

impl LedgerClient for HorizonClient {
    fn account(&self, id: &PublicKey) -> Result<Account, Error> {
        let raw: RawAccount = self.get_json(&format!("{}/accounts/{}", self.base, id))?;
        let sequence = raw
            .sequence
            .parse::<i64>()
            .map_err(|err| Error::Fetch(format!("invalid account sequence: {}", err)))?;
        let balance = raw
            .balances
            .iter()
            .find(|balance| balance.asset_type == "native")
            .map(|balance| balance.balance)
            .ok_or_else(|| Error::Fetch(format!("account {} has no native balance", id)))?;
        let signers = raw
            .signers
            .iter()
            .map(|signer| Signer {
                key: signer_key(&signer.kind, &signer.key),
                weight: signer.weight,
            })
            .collect();
        Ok(Account {
            id: *id,
            sequence,
            balance,
            signers,
            thresholds: Thresholds {
                low: raw.thresholds.low_threshold,
                med: raw.thresholds.med_threshold,
                high: raw.thresholds.high_threshold,
            },
        })
    }

    fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmitResult, Error> {
        let url = format!("{}/transactions", self.base);
        debug!(url = %url, "submitting transaction");
        let response = self
            .http
            .post(&url)
            .form(&[("tx", envelope.to_base64())])
            .send()
            .map_err(|err| Error::Fetch(err.to_string()))?;
        if !response.status().is_success() {
            let problem: RawProblem = response.json().unwrap_or_default();
            return Err(Error::Rejected(rejection(problem)));
        }
        let submitted: RawSubmitted = response
            .json()
            .map_err(|err| Error::Fetch(err.to_string()))?;
        let hash = submitted
            .hash
            .parse::<TxHash>()
            .map_err(|err| Error::Fetch(format!("invalid transaction hash: {}", err)))?;
        Ok(SubmitResult { hash })
    }

    fn debiting_transactions(&self, id: &PublicKey) -> Result<Vec<TransactionRecord>, Error> {
        let url = format!("{}/accounts/{}/effects?limit=100", self.base, id);
        let page: RawPage<RawEffect> = self.get_json(&url)?;
        let mut records = Vec::new();
        for effect in page.embedded.records {
            if effect.kind != "account_debited" {
                continue;
            }
            let operation: RawOperation = self.get_json(&effect.links.operation.href)?;
            let transaction: RawTransaction = self.get_json(&format!(
                "{}/transactions/{}",
                self.base, operation.transaction_hash
            ))?;
            let hash = transaction
                .hash
                .parse::<TxHash>()
                .map_err(|err| Error::Fetch(format!("invalid transaction hash: {}", err)))?;
            let mut signatures = Vec::with_capacity(transaction.signatures.len());
            for signature in &transaction.signatures {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(signature)
                    .map_err(|err| {
                        Error::Fetch(format!("error base64 decoding signature: {}", err))
                    })?;
                signatures.push(bytes);
            }
            records.push(TransactionRecord { hash, signatures });
        }
        Ok(records)
    }
}
