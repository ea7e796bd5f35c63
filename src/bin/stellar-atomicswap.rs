//! Command-line tool driving the atomic-swap engine.
//!
//! There are two directions the swap can be performed in, as the initiator
//! can be on either chain. This tool only builds the transactions for the
//! ledger leg; a second tool drives the other chain. Any chain works as
//! long as it supports a sha256 hash lock and an absolute time lock.

use std::error::Error;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use serde::Serialize;

use stellar_atomicswap::crypto::{KeyPair, PublicKey, Secret, SecretHash};
use stellar_atomicswap::ledger::client::LedgerClient;
use stellar_atomicswap::ledger::horizon::HorizonClient;
use stellar_atomicswap::ledger::transaction::TransactionEnvelope;
use stellar_atomicswap::ledger::{Amount, Network};
use stellar_atomicswap::swap::{
    audit_contract, create_holding_account, extract_secret, redeem, SwapRole,
};

#[derive(Parser)]
#[clap(name = "stellar-atomicswap", version, about = "Ledger leg of a cross-chain atomic swap")]
struct Cli {
    /// Use the testnet network.
    #[clap(long, global = true)]
    testnet: bool,
    /// Automated/unattended mode with a single-line JSON output.
    #[clap(long, global = true)]
    automated: bool,
    /// Override the horizon endpoint.
    #[clap(long, global = true)]
    horizon: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a swap: generate a secret and build the escrow for it.
    Initiate {
        /// Seed of the account funding the escrow.
        initiator_seed: String,
        /// Address of the counterparty allowed to redeem.
        participant_address: String,
        /// Amount to escrow, in whole asset units.
        amount: String,
    },
    /// Answer a swap: build the escrow for an already agreed secret hash.
    Participate {
        /// Seed of the account funding the escrow.
        participant_seed: String,
        /// Address of the counterparty allowed to redeem.
        initiator_address: String,
        /// Amount to escrow, in whole asset units.
        amount: String,
        /// Hex-encoded sha256 hash of the counterparty's secret.
        secret_hash: String,
    },
    /// Verify a counterparty's escrow against its claimed refund transaction.
    Auditcontract {
        /// Address of the escrow account to audit.
        holding_account_address: String,
        /// The claimed refund transaction, base64-encoded.
        refund_transaction: String,
    },
    /// Redeem an escrow by revealing the secret.
    Redeem {
        /// Seed of the receiving account.
        receiver_seed: String,
        /// Address of the escrow account.
        holding_account_address: String,
        /// Hex-encoded 32-byte secret.
        secret: String,
    },
    /// Resubmit a pre-built refund transaction verbatim.
    Refund {
        /// The refund transaction, base64-encoded.
        refund_transaction: String,
    },
    /// Recover the revealed secret from a settled escrow spend.
    Extractsecret {
        /// Address of the escrow account.
        holding_account_address: String,
        /// Hex-encoded sha256 hash the secret must match.
        secret_hash: String,
    },
}

#[derive(Serialize)]
struct InitiateOutput {
    secret: String,
    hash: String,
    initiator: String,
    holdingaccount: String,
    refundtransaction: String,
}

#[derive(Serialize)]
struct ParticipateOutput {
    participant: String,
    holdingaccount: String,
    refundtransaction: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditOutput {
    contract_address: String,
    contract_value: String,
    recipient_address: String,
    refund_address: String,
    secret_hash: String,
    locktime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RedeemOutput {
    redeem_transaction: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundOutput {
    refund_transaction: String,
}

#[derive(Serialize)]
struct ExtractOutput {
    secret: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let network = if cli.testnet {
        Network::Testnet
    } else {
        Network::Mainnet
    };
    let client = match &cli.horizon {
        Some(base) => HorizonClient::new(base.clone()),
        None => HorizonClient::for_network(network),
    };

    match &cli.command {
        Command::Initiate {
            initiator_seed,
            participant_address,
            amount,
        } => {
            let initiator = KeyPair::from_seed(initiator_seed)
                .map_err(|err| format!("invalid initiator seed: {}", err))?;
            let participant = participant_address
                .parse::<PublicKey>()
                .map_err(|err| format!("invalid participant address: {}", err))?;
            let amount = amount
                .parse::<Amount>()
                .map_err(|err| format!("failed to decode amount: {}", err))?;

            let secret = Secret::generate();
            let holding = KeyPair::generate();
            let locktime = SwapRole::Initiator.locktime(unix_time_now()?);
            let escrow = create_holding_account(
                &client,
                network,
                &initiator,
                &holding,
                participant,
                amount,
                secret.hash(),
                locktime,
            )?;

            let refund_b64 = escrow.refund_transaction.to_base64();
            if cli.automated {
                print_json(&InitiateOutput {
                    secret: secret.to_string(),
                    hash: secret.hash().to_string(),
                    initiator: initiator.public_key().to_string(),
                    holdingaccount: escrow.address.to_string(),
                    refundtransaction: refund_b64,
                })?;
            } else {
                println!("Secret:      {}", secret);
                println!("Secret hash: {}\n", secret.hash());
                println!("initiator address: {}", initiator.public_key());
                println!("holding account address: {}", escrow.address);
                println!("refund transaction:\n{}", refund_b64);
            }
        }
        Command::Participate {
            participant_seed,
            initiator_address,
            amount,
            secret_hash,
        } => {
            let participant = KeyPair::from_seed(participant_seed)
                .map_err(|err| format!("invalid participant seed: {}", err))?;
            let initiator = initiator_address
                .parse::<PublicKey>()
                .map_err(|err| format!("invalid initiator address: {}", err))?;
            let amount = amount
                .parse::<Amount>()
                .map_err(|err| format!("failed to decode amount: {}", err))?;
            let secret_hash = secret_hash
                .parse::<SecretHash>()
                .map_err(|err| format!("invalid secret hash: {}", err))?;

            let holding = KeyPair::generate();
            let locktime = SwapRole::Participant.locktime(unix_time_now()?);
            let escrow = create_holding_account(
                &client,
                network,
                &participant,
                &holding,
                initiator,
                amount,
                secret_hash,
                locktime,
            )?;

            let refund_b64 = escrow.refund_transaction.to_base64();
            if cli.automated {
                print_json(&ParticipateOutput {
                    participant: participant.public_key().to_string(),
                    holdingaccount: escrow.address.to_string(),
                    refundtransaction: refund_b64,
                })?;
            } else {
                println!("participant address: {}", participant.public_key());
                println!("holding account address: {}", escrow.address);
                println!("refund transaction:\n{}", refund_b64);
            }
        }
        Command::Auditcontract {
            holding_account_address,
            refund_transaction,
        } => {
            let holding_account = holding_account_address
                .parse::<PublicKey>()
                .map_err(|err| format!("invalid holding account address: {}", err))?;
            let refund_transaction = TransactionEnvelope::from_base64(refund_transaction)
                .map_err(|err| format!("failed to decode refund transaction: {}", err))?;

            let contract = audit_contract(&client, network, &holding_account, &refund_transaction)?;
            if cli.automated {
                print_json(&AuditOutput {
                    contract_address: contract.holding_account.to_string(),
                    contract_value: contract.balance.to_string(),
                    recipient_address: contract.recipient.to_string(),
                    refund_address: contract.refund_address.to_string(),
                    secret_hash: contract.secret_hash.to_string(),
                    locktime: contract.locktime,
                })?;
            } else {
                println!("Contract address:  {}", contract.holding_account);
                println!("Contract value:    {}", contract.balance);
                println!("Recipient address: {}", contract.recipient);
                println!("Refund address:    {}\n", contract.refund_address);
                println!("Secret hash: {}\n", contract.secret_hash);
                println!("Locktime: {} (unix seconds)", contract.locktime);
                let now = unix_time_now()?;
                if contract.locktime > now {
                    println!(
                        "Locktime reached in {}",
                        format_duration(contract.locktime - now)
                    );
                } else {
                    println!("Refund time lock has expired");
                }
            }
        }
        Command::Redeem {
            receiver_seed,
            holding_account_address,
            secret,
        } => {
            let receiver = KeyPair::from_seed(receiver_seed)
                .map_err(|err| format!("invalid receiver seed: {}", err))?;
            let holding_account = holding_account_address
                .parse::<PublicKey>()
                .map_err(|err| format!("invalid holding account address: {}", err))?;
            let secret = secret
                .parse::<Secret>()
                .map_err(|err| format!("failed to decode secret: {}", err))?;

            let result = redeem(&client, network, &receiver, holding_account, &secret)?;
            if cli.automated {
                print_json(&RedeemOutput {
                    redeem_transaction: result.hash.to_string(),
                })?;
            } else {
                println!("redeem transaction: {}", result.hash);
            }
        }
        Command::Refund { refund_transaction } => {
            let envelope = TransactionEnvelope::from_base64(refund_transaction)
                .map_err(|err| format!("failed to decode refund transaction: {}", err))?;
            let result = client.submit(&envelope)?;
            if cli.automated {
                print_json(&RefundOutput {
                    refund_transaction: result.hash.to_string(),
                })?;
            } else {
                println!("refund transaction: {}", result.hash);
            }
        }
        Command::Extractsecret {
            holding_account_address,
            secret_hash,
        } => {
            let holding_account = holding_account_address
                .parse::<PublicKey>()
                .map_err(|err| format!("invalid holding account address: {}", err))?;
            let secret_hash = secret_hash
                .parse::<SecretHash>()
                .map_err(|err| format!("invalid secret hash: {}", err))?;

            let secret = extract_secret(&client, &holding_account, &secret_hash)?;
            if cli.automated {
                print_json(&ExtractOutput {
                    secret: secret.to_string(),
                })?;
            } else {
                println!("Extracted secret: {}", secret);
            }
        }
    }
    Ok(())
}

fn unix_time_now() -> Result<u64, Box<dyn Error>> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn print_json<T: Serialize>(output: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string(output)?);
    Ok(())
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
