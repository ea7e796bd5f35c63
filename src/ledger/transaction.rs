//! Transactions, envelopes and their authorization material.
//!
//! A [`Transaction`] is the unsigned payload: source account, fee, sequence
//! number, time bounds and a closed set of operations. Its hash binds the
//! payload to a [`Network`], and a [`TransactionEnvelope`] carries the
//! payload together with decorated signatures: real ed25519 signatures or
//! raw preimages satisfying hash-lock signers.

use std::fmt::{self, Debug};
use std::io;
use std::str::FromStr;

use thiserror::Error;

use crate::consensus::{self, Decodable, Encodable};
use crate::crypto::{sha256, KeyPair, PublicKey};
use crate::ledger::{Amount, Network, Signer};

/// Fee in stroops charged per operation.
pub const BASE_FEE: u32 = 100;

/// Maximum byte length of a decorated signature's payload. An ed25519
/// signature is 64 bytes; preimages never exceed it.
pub const MAX_SIGNATURE_SIZE: usize = 64;

/// Domain separation tag mixed into transaction hashes after the network id.
const ENVELOPE_TYPE_TX: u32 = 2;

/// A list specifying general categories of transaction construction errors.
#[derive(Error, Debug)]
pub enum Error {
    /// The transaction carries no operation.
    #[error("A transaction must contain at least one operation")]
    NoOperations,
    /// The sequence number cannot be represented.
    #[error("Sequence number overflow")]
    SequenceOverflow,
    /// The fee cannot be represented.
    #[error("Fee overflow")]
    FeeOverflow,
}

/// Hash of a transaction, bound to the network it was computed for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Construct a hash from its raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return a reference to the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = consensus::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(consensus::Error::new)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| consensus::Error::ParseFailed("A transaction hash is 32 bytes"))?;
        Ok(Self(bytes))
    }
}

/// Validity window of a transaction in ledger close time. A bound of 0
/// means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    /// Earliest time (unix seconds) the transaction is valid, 0 for none.
    pub min_time: u64,
    /// Latest time (unix seconds) the transaction is valid, 0 for none.
    pub max_time: u64,
}

impl TimeBounds {
    /// No validity restriction: the transaction is immediately eligible.
    pub fn none() -> Self {
        Self {
            min_time: 0,
            max_time: 0,
        }
    }

    /// Valid from `min_time` on, with no upper bound. This is the refund
    /// locktime shape.
    pub fn after(min_time: u64) -> Self {
        Self {
            min_time,
            max_time: 0,
        }
    }

    /// Whether `now` falls inside the window.
    pub fn contains(&self, now: u64) -> bool {
        now >= self.min_time && (self.max_time == 0 || now <= self.max_time)
    }
}

impl Encodable for TimeBounds {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let len = self.min_time.consensus_encode(writer)?;
        Ok(len + self.max_time.consensus_encode(writer)?)
    }
}

impl Decodable for TimeBounds {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(TimeBounds {
            min_time: Decodable::consensus_decode(d)?,
            max_time: Decodable::consensus_decode(d)?,
        })
    }
}

/// Security level an operation requires; accounts configure one threshold
/// per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThresholdLevel {
    /// Low-security operations.
    Low,
    /// Medium-security operations.
    Medium,
    /// High-security operations.
    High,
}

/// The closed set of ledger operations this protocol deals in. Unknown
/// operation kinds fail decoding; they are never carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a new account funded with a starting balance taken from the
    /// transaction source.
    CreateAccount {
        /// The address of the account to create.
        destination: PublicKey,
        /// The balance the new account starts with.
        starting_balance: Amount,
    },
    /// Change the source account's signing configuration. Absent fields are
    /// left untouched; all present fields are applied atomically with the
    /// rest of the transaction.
    SetOptions {
        /// New weight of the account's own master key.
        master_weight: Option<u8>,
        /// New low threshold.
        low_threshold: Option<u8>,
        /// New medium threshold.
        medium_threshold: Option<u8>,
        /// New high threshold.
        high_threshold: Option<u8>,
        /// Signer entry to add or update; weight 0 removes it.
        signer: Option<Signer>,
    },
    /// Transfer the source account's entire balance to the destination and
    /// remove the source account from the ledger.
    AccountMerge {
        /// The address receiving the merged balance.
        destination: PublicKey,
    },
}

impl Operation {
    /// Shorthand for a [`Operation::SetOptions`] that only installs a signer.
    pub fn add_signer(signer: Signer) -> Self {
        Operation::SetOptions {
            master_weight: None,
            low_threshold: None,
            medium_threshold: None,
            high_threshold: None,
            signer: Some(signer),
        }
    }

    /// The security level the operation requires on its source account.
    pub fn threshold_level(&self) -> ThresholdLevel {
        match self {
            Operation::CreateAccount { .. } => ThresholdLevel::Medium,
            Operation::SetOptions { .. } => ThresholdLevel::High,
            Operation::AccountMerge { .. } => ThresholdLevel::High,
        }
    }
}

impl Encodable for Operation {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        match self {
            Operation::CreateAccount {
                destination,
                starting_balance,
            } => {
                let mut len = 0x01u8.consensus_encode(writer)?;
                len += destination.consensus_encode(writer)?;
                Ok(len + starting_balance.consensus_encode(writer)?)
            }
            Operation::SetOptions {
                master_weight,
                low_threshold,
                medium_threshold,
                high_threshold,
                signer,
            } => {
                let mut len = 0x02u8.consensus_encode(writer)?;
                len += master_weight.consensus_encode(writer)?;
                len += low_threshold.consensus_encode(writer)?;
                len += medium_threshold.consensus_encode(writer)?;
                len += high_threshold.consensus_encode(writer)?;
                Ok(len + signer.consensus_encode(writer)?)
            }
            Operation::AccountMerge { destination } => {
                let len = 0x03u8.consensus_encode(writer)?;
                Ok(len + destination.consensus_encode(writer)?)
            }
        }
    }
}

impl Decodable for Operation {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        match Decodable::consensus_decode(d)? {
            0x01u8 => Ok(Operation::CreateAccount {
                destination: Decodable::consensus_decode(d)?,
                starting_balance: Decodable::consensus_decode(d)?,
            }),
            0x02u8 => Ok(Operation::SetOptions {
                master_weight: Decodable::consensus_decode(d)?,
                low_threshold: Decodable::consensus_decode(d)?,
                medium_threshold: Decodable::consensus_decode(d)?,
                high_threshold: Decodable::consensus_decode(d)?,
                signer: Decodable::consensus_decode(d)?,
            }),
            0x03u8 => Ok(Operation::AccountMerge {
                destination: Decodable::consensus_decode(d)?,
            }),
            _ => Err(consensus::Error::UnknownType),
        }
    }
}

/// An unsigned transaction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The account the transaction is sourced from; it pays the fee and its
    /// sequence number is consumed.
    pub source: PublicKey,
    /// Total fee in stroops.
    pub fee: u32,
    /// The sequence number this transaction consumes.
    pub sequence: i64,
    /// The validity window.
    pub time_bounds: TimeBounds,
    /// The operations applied atomically, in order.
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Build a transaction over the given operations, charging the base fee
    /// per operation.
    pub fn new(
        source: PublicKey,
        sequence: i64,
        time_bounds: TimeBounds,
        operations: Vec<Operation>,
    ) -> Result<Self, Error> {
        if operations.is_empty() {
            return Err(Error::NoOperations);
        }
        let fee = BASE_FEE
            .checked_mul(operations.len() as u32)
            .ok_or(Error::FeeOverflow)?;
        Ok(Transaction {
            source,
            fee,
            sequence,
            time_bounds,
            operations,
        })
    }

    /// Compute the transaction hash for the given network:
    /// `sha256(network id || envelope type tag || payload)`.
    pub fn hash(&self, network: Network) -> TxHash {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&network.id());
        preimage.extend_from_slice(&consensus::serialize(&ENVELOPE_TYPE_TX));
        preimage.extend_from_slice(&consensus::serialize(self));
        TxHash(sha256(&preimage))
    }

    /// Wrap the payload in an envelope carrying no signatures yet.
    pub fn into_envelope(self) -> TransactionEnvelope {
        TransactionEnvelope {
            transaction: self,
            signatures: Vec::new(),
        }
    }
}

impl Encodable for Transaction {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let mut len = self.source.consensus_encode(writer)?;
        len += self.fee.consensus_encode(writer)?;
        len += self.sequence.consensus_encode(writer)?;
        len += self.time_bounds.consensus_encode(writer)?;
        Ok(len + self.operations.consensus_encode(writer)?)
    }
}

impl Decodable for Transaction {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(Transaction {
            source: Decodable::consensus_decode(d)?,
            fee: Decodable::consensus_decode(d)?,
            sequence: Decodable::consensus_decode(d)?,
            time_bounds: Decodable::consensus_decode(d)?,
            operations: Decodable::consensus_decode(d)?,
        })
    }
}

/// A signature hint plus payload. The payload is either a real ed25519
/// signature or the raw preimage satisfying a hash-lock signer; the hint is
/// the last four bytes of the signing key, respectively of the hash the
/// preimage commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    /// Hint identifying the signer the payload is meant for.
    pub hint: [u8; 4],
    /// The signature or preimage bytes.
    pub signature: Vec<u8>,
}

impl Encodable for DecoratedSignature {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let len = self.hint.consensus_encode(writer)?;
        Ok(len + self.signature.consensus_encode(writer)?)
    }
}

impl Decodable for DecoratedSignature {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(DecoratedSignature {
            hint: Decodable::consensus_decode(d)?,
            signature: Decodable::consensus_decode(d)?,
        })
    }
}

/// A transaction payload together with the authorizations collected so far.
/// This is the form transactions are submitted and exchanged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    /// The unsigned payload.
    pub transaction: Transaction,
    /// The decorated signatures attached so far.
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Hash of the carried payload for the given network.
    pub fn hash(&self, network: Network) -> TxHash {
        self.transaction.hash(network)
    }

    /// Sign the payload with a real keypair and attach the decorated
    /// signature.
    pub fn sign(&mut self, network: Network, keypair: &KeyPair) {
        let hash = self.hash(network);
        let signature = keypair.sign(hash.as_bytes());
        self.signatures.push(DecoratedSignature {
            hint: keypair.public_key().hint(),
            signature: signature.as_bytes().to_vec(),
        });
    }

    /// Attach a raw preimage as authorization for a hash-lock signer. The
    /// hint is taken from the hash the preimage commits to.
    pub fn sign_hashx(&mut self, preimage: &[u8]) {
        let hash = sha256(preimage);
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&hash[28..]);
        self.signatures.push(DecoratedSignature {
            hint,
            signature: preimage.to_vec(),
        });
    }

    /// Serialize the envelope to the base64 exchange format.
    pub fn to_base64(&self) -> String {
        consensus::serialize_b64(self)
    }

    /// Parse an envelope from the base64 exchange format.
    pub fn from_base64(encoded: &str) -> Result<Self, consensus::Error> {
        consensus::deserialize_b64(encoded)
    }
}

impl Encodable for TransactionEnvelope {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let len = self.transaction.consensus_encode(writer)?;
        Ok(len + self.signatures.consensus_encode(writer)?)
    }
}

impl Decodable for TransactionEnvelope {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(TransactionEnvelope {
            transaction: Decodable::consensus_decode(d)?,
            signatures: Decodable::consensus_decode(d)?,
        })
    }
}
