//! Swap roles and the locktime asymmetry between them.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::consensus;

/// Safety margin granted to the swap initiator before their escrow becomes
/// refundable.
pub const INITIATOR_LOCK_DURATION: Duration = Duration::from_secs(48 * 60 * 60);

/// The two roles of one swap. The initiator generates the secret and must
/// act first by revealing it, so their refund locktime is twice the
/// participant's: the participant's escrow becomes refundable well before
/// the initiator's does.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SwapRole {
    /// The party generating the secret and opening the first escrow.
    Initiator,
    /// The party funding the second escrow against a known secret hash.
    Participant,
}

impl SwapRole {
    /// Return the other role of the swap.
    pub fn other(&self) -> Self {
        match self {
            Self::Initiator => Self::Participant,
            Self::Participant => Self::Initiator,
        }
    }

    /// The lock duration this role applies to its refund transaction.
    pub fn lock_duration(&self) -> Duration {
        match self {
            Self::Initiator => INITIATOR_LOCK_DURATION,
            Self::Participant => INITIATOR_LOCK_DURATION / 2,
        }
    }

    /// Absolute refund locktime, in unix seconds, for an escrow created at
    /// `now`.
    pub fn locktime(&self, now: u64) -> u64 {
        now + self.lock_duration().as_secs()
    }
}

impl fmt::Display for SwapRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SwapRole::Initiator => write!(f, "Initiator"),
            SwapRole::Participant => write!(f, "Participant"),
        }
    }
}

impl FromStr for SwapRole {
    type Err = consensus::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initiator" | "initiator" => Ok(SwapRole::Initiator),
            "Participant" | "participant" => Ok(SwapRole::Participant),
            _ => Err(consensus::Error::UnknownType),
        }
    }
}
