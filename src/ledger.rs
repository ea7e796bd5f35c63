//! Data model of the ledger the swap runs against: networks, accounts,
//! signers and thresholds. The ledger itself is reached through the
//! [`client::LedgerClient`] seam; [`memory::MemoryLedger`] is an in-process
//! implementation used by the test-suite and demos.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::consensus::{self, Decodable, Encodable};
use crate::crypto::{sha256, PublicKey};
use crate::strkey;

pub mod amount;
pub mod client;
#[cfg(feature = "horizon")]
pub mod horizon;
pub mod memory;
pub mod transaction;

pub use amount::Amount;

/// Defines a ledger network, identifying in which context the system
/// interacts with the chain. The network is an explicit value threaded into
/// every builder and auditor call; transaction hashes are bound to it
/// through the network id.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
pub enum Network {
    /// Represents real assets on the public network.
    Mainnet,
    /// Represents non-valuable assets on the shared test network.
    Testnet,
    /// Local and private test deployments.
    Local,
}

impl Network {
    /// The network passphrase separating transaction hashes across chains.
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Mainnet => "Public Global Stellar Network ; September 2015",
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Local => "Standalone Network ; February 2017",
        }
    }

    /// The 32-byte network id mixed into every transaction hash.
    pub fn id(&self) -> [u8; 32] {
        sha256(self.passphrase().as_bytes())
    }
}

impl FromStr for Network {
    type Err = consensus::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mainnet" | "mainnet" => Ok(Network::Mainnet),
            "Testnet" | "testnet" => Ok(Network::Testnet),
            "Local" | "local" => Ok(Network::Local),
            _ => Err(consensus::Error::UnknownType),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "Mainnet"),
            Network::Testnet => write!(f, "Testnet"),
            Network::Local => write!(f, "Local"),
        }
    }
}

impl Encodable for Network {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        match self {
            Network::Mainnet => 0x01u8.consensus_encode(writer),
            Network::Testnet => 0x02u8.consensus_encode(writer),
            Network::Local => 0x03u8.consensus_encode(writer),
        }
    }
}

impl Decodable for Network {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        match Decodable::consensus_decode(d)? {
            0x01u8 => Ok(Network::Mainnet),
            0x02u8 => Ok(Network::Testnet),
            0x03u8 => Ok(Network::Local),
            _ => Err(consensus::Error::UnknownType),
        }
    }
}

/// Key material a signer entry can carry. Classification is an explicit
/// tagged union dispatched by pattern match; [`SignerKey::Unknown`] carries
/// signer kinds this protocol does not understand and is always an error
/// path, never silently accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerKey {
    /// An account address: satisfied by an ed25519 signature of that key.
    Ed25519(PublicKey),
    /// A sha256 hash: satisfied by revealing a preimage hashing to it.
    HashX([u8; 32]),
    /// A transaction hash: satisfied once a transaction matching exactly
    /// this hash, honoring its time bounds, is submitted.
    PreAuthTx([u8; 32]),
    /// A signer kind unknown to this protocol.
    Unknown {
        /// The kind reported by the ledger.
        type_name: String,
        /// The raw key string reported by the ledger.
        key: String,
    },
}

impl fmt::Display for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignerKey::Ed25519(key) => write!(f, "{}", key),
            SignerKey::HashX(hash) => {
                write!(f, "{}", strkey::encode(strkey::Version::Sha256Hash, hash))
            }
            SignerKey::PreAuthTx(hash) => {
                write!(f, "{}", strkey::encode(strkey::Version::PreAuthTx, hash))
            }
            SignerKey::Unknown { key, .. } => write!(f, "{}", key),
        }
    }
}

impl Encodable for SignerKey {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        match self {
            SignerKey::Ed25519(key) => {
                0x01u8.consensus_encode(writer)?;
                Ok(1 + key.consensus_encode(writer)?)
            }
            SignerKey::HashX(hash) => {
                0x02u8.consensus_encode(writer)?;
                Ok(1 + hash.consensus_encode(writer)?)
            }
            SignerKey::PreAuthTx(hash) => {
                0x03u8.consensus_encode(writer)?;
                Ok(1 + hash.consensus_encode(writer)?)
            }
            SignerKey::Unknown { .. } => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Unknown signer kinds are not encodable",
            )),
        }
    }
}

impl Decodable for SignerKey {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        match Decodable::consensus_decode(d)? {
            0x01u8 => Ok(SignerKey::Ed25519(Decodable::consensus_decode(d)?)),
            0x02u8 => Ok(SignerKey::HashX(Decodable::consensus_decode(d)?)),
            0x03u8 => Ok(SignerKey::PreAuthTx(Decodable::consensus_decode(d)?)),
            _ => Err(consensus::Error::UnknownType),
        }
    }
}

/// A weighted signer entry of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    /// The key material of the entry.
    pub key: SignerKey,
    /// The weight this entry contributes towards the thresholds.
    pub weight: u8,
}

impl Encodable for Signer {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let len = self.key.consensus_encode(writer)?;
        Ok(len + self.weight.consensus_encode(writer)?)
    }
}

impl Decodable for Signer {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(Signer {
            key: Decodable::consensus_decode(d)?,
            weight: Decodable::consensus_decode(d)?,
        })
    }
}

/// Minimum total signer weight required to authorize an operation, per
/// security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Threshold for low-security operations.
    pub low: u8,
    /// Threshold for medium-security operations (e.g. account creation).
    pub med: u8,
    /// Threshold for high-security operations (e.g. merges, signer changes).
    pub high: u8,
}

/// State of an account as returned by a ledger client: current sequence
/// number, native balance, signer set and threshold configuration. The
/// master key appears in the signer set as an entry for the account's own
/// address, weight 0 when disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// The account id.
    pub id: PublicKey,
    /// The current sequence number; the next transaction sourced from this
    /// account must consume `sequence + 1`.
    pub sequence: i64,
    /// The native asset balance.
    pub balance: Amount,
    /// The weighted signer set, master key entry included.
    pub signers: Vec<Signer>,
    /// The low/medium/high thresholds.
    pub thresholds: Thresholds,
}

impl Account {
    /// The weight of the account's own master key, 0 when disabled or
    /// absent from the signer set.
    pub fn master_weight(&self) -> u8 {
        self.signers
            .iter()
            .find(|signer| signer.key == SignerKey::Ed25519(self.id))
            .map(|signer| signer.weight)
            .unwrap_or(0)
    }
}
