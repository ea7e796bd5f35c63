//! Cryptographic types used by the swap protocol: ed25519 keys and
//! signatures, the hash-lock secret and its sha256 commitment.
//!
//! A [`KeyPair`] is the "full" form owning signing capability; a
//! [`PublicKey`] doubles as the account id on the ledger, so addresses and
//! verification keys are the same 32 bytes under two encodings.

use std::fmt::{self, Debug};
use std::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore as _;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consensus::{self, Decodable, Encodable};
use crate::strkey;

/// Size in bytes of the swap secret. The preimage revealed on redeem is
/// always exactly this long.
pub const SECRET_SIZE: usize = 32;

/// List of cryptographic errors that can be encountered when parsing keys,
/// seeds or secrets, or when validating signatures.
#[derive(Error, Debug)]
pub enum Error {
    /// The seed does not decode to a valid signing key.
    #[error("Invalid seed")]
    InvalidSeed,
    /// The public key bytes are not a valid ed25519 point.
    #[error("Invalid public key")]
    InvalidPublicKey,
    /// The signature does not pass the validation.
    #[error("The signature does not pass the validation")]
    InvalidSignature,
    /// The secret has a wrong byte length.
    #[error("The secret should be {SECRET_SIZE} bytes instead of {0}")]
    InvalidSecretLength(usize),
    /// The secret hash has a wrong byte length.
    #[error("The secret hash should be 32 bytes instead of {0}")]
    InvalidHashLength(usize),
    /// A hex string could not be decoded.
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
    /// A strkey string could not be decoded.
    #[error("Strkey error: {0}")]
    Strkey(#[from] strkey::Error),
}

/// Compute the sha256 digest of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// An ed25519 public key. Also the account id: the ledger addresses accounts
/// by their master verification key, strkey-encoded with a `G` prefix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Construct a public key from its raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return a reference to the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The signature hint associated with this key: its last four bytes,
    /// carried in decorated signatures so verifiers can pre-select candidate
    /// keys.
    pub fn hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[28..]);
        hint
    }

    /// Verify an ed25519 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), Error> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| Error::InvalidPublicKey)?;
        let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        key.verify_strict(message, &signature)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", strkey::encode(strkey::Version::AccountId, &self.0))
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(strkey::decode(strkey::Version::AccountId, s)?))
    }
}

impl Encodable for PublicKey {
    fn consensus_encode<W: std::io::Write>(&self, writer: &mut W) -> Result<usize, std::io::Error> {
        self.0.consensus_encode(writer)
    }
}

impl Decodable for PublicKey {
    fn consensus_decode<D: std::io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(Self(Decodable::consensus_decode(d)?))
    }
}

/// A raw ed25519 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Construct a signature from its raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return a reference to the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// A full keypair: the public half doubling as the account id and the secret
/// half owning signing capability. Exclusively owned by the party that
/// generated it.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Parse a keypair from its strkey seed (`S…`).
    pub fn from_seed(seed: &str) -> Result<Self, Error> {
        let bytes = strkey::decode(strkey::Version::Seed, seed).map_err(|_| Error::InvalidSeed)?;
        Ok(Self {
            signing: SigningKey::from_bytes(&bytes),
        })
    }

    /// Return the strkey seed encoding of the secret half.
    pub fn seed(&self) -> String {
        strkey::encode(strkey::Version::Seed, &self.signing.to_bytes())
    }

    /// Return the public half, i.e. the account id this keypair controls.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// Sign a message with the secret half.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing.sign(message).to_bytes())
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Never leak the seed through debug output.
        write!(f, "KeyPair({})", self.public_key())
    }
}

/// The swap secret: 32 uniformly random bytes, known only to its generator
/// until revealed by redemption.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secret([u8; SECRET_SIZE]);

impl Secret {
    /// Generate a fresh uniformly random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Construct a secret from raw bytes, validating the length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; SECRET_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSecretLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Return a reference to the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }

    /// Compute the public sha256 commitment to this secret.
    pub fn hash(&self) -> SecretHash {
        SecretHash(sha256(&self.0))
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Secret({})", self)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Secret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(&hex::decode(s)?)
    }
}

/// The sha256 commitment to a [`Secret`]; public, exchanged between the
/// parties before either escrow is funded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretHash([u8; 32]);

impl SecretHash {
    /// Construct a commitment from its raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return a reference to the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Validate a candidate preimage against this commitment.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        sha256(candidate) == self.0
    }
}

impl Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SecretHash({})", self)
    }
}

impl fmt::Display for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for SecretHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHashLength(len))?;
        Ok(Self(bytes))
    }
}
