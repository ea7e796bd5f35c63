//! The atomic-swap protocol engine.
//!
//! Control flow of one swap leg: [`holding::create_holding_account`] (which
//! uses [`refund::build_refund_transaction`] internally) puts the escrow on
//! the ledger; the counterparty runs [`audit::audit_contract`] before
//! funding their own leg; later either [`redeem::redeem`] or the pre-built
//! refund transaction terminates the escrow, and
//! [`secret::extract_secret`] recovers the revealed preimage from the
//! settled redeem transaction for use on the other chain.

pub mod audit;
pub mod holding;
pub mod redeem;
pub mod refund;
pub mod role;
pub mod secret;

pub use audit::{audit_contract, AuditError, Contract};
pub use holding::{create_holding_account, HoldingAccount};
pub use redeem::redeem;
pub use refund::build_refund_transaction;
pub use role::SwapRole;
pub use secret::{extract_secret, ExtractionError};

/// Weight of the recipient signer: the counterparty's account address.
pub const RECIPIENT_WEIGHT: u8 = 1;

/// Weight of the secret-hash commitment signer, satisfied by revealing the
/// preimage.
pub const SECRET_WEIGHT: u8 = 1;

/// Weight of the refund-transaction commitment signer; it meets the
/// spending threshold on its own once the committed transaction is
/// submitted inside its time bounds.
pub const REFUND_WEIGHT: u8 = 2;

/// The spending threshold installed at all three security levels. The
/// signer algebra is the entire security model:
/// `RECIPIENT_WEIGHT + SECRET_WEIGHT == SPENDING_THRESHOLD == REFUND_WEIGHT`
/// while the master key weighs 0, so the only two spending paths are
/// recipient-signature-plus-preimage and the pre-committed refund.
pub const SPENDING_THRESHOLD: u8 = 2;
