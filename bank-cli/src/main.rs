//! Bank CLI
//!
//! Command-line interface for the Bank API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use bank_client::{BankClient, ClientError};
use bank_types::{
    CurrencyCode, TransactionDirection, TransactionMessage, TransferId, TransferRequest,
};

#[derive(Parser)]
#[command(name = "bank")]
#[command(author, version, about = "Bank API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Bank API
    #[arg(long, env = "BANK_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Identifier sent as x-client-id for rate limiting
    #[arg(long, env = "BANK_CLIENT_ID")]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },
    /// Stream exchange rates for a currency pair
    Rates {
        #[arg(long, default_value = "USD")]
        from: String,
        #[arg(long, default_value = "IDR")]
        to: String,
        /// Stop after this many updates (streams until interrupted when omitted)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Apply transactions to one account and print the summary
    Summarize {
        #[arg(long)]
        account: String,
        /// Transaction as TYPE:AMOUNT, e.g. IN:100 or OUT:40 (repeatable)
        #[arg(long = "tx", required = true)]
        transactions: Vec<String>,
    },
    /// Transfer operations
    Transfer {
        #[command(subcommand)]
        action: TransferCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Provision a new account with zero balance
    Create {
        /// Account number
        number: String,
        /// Account holder name
        name: String,
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Get account details
    Get { number: String },
    /// Current balance and its IDR value
    Balance { number: String },
    /// Transaction history
    History { number: String },
}

#[derive(Subcommand)]
enum TransferCommands {
    /// Send one transfer per --amount, in order, over a single stream
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long = "amount", required = true)]
        amounts: Vec<Decimal>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Get a stored transfer record
    Get {
        /// Transfer ID (UUID)
        id: String,
    },
}

fn parse_currency(s: &str) -> Result<CurrencyCode> {
    s.parse()
        .map_err(|e: bank_types::UnknownCurrency| anyhow::anyhow!("{}", e))
}

fn parse_transaction(account: &str, raw: &str) -> Result<TransactionMessage> {
    let (kind, amount) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Expected TYPE:AMOUNT, got {}", raw))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid amount in {}", raw))?;

    Ok(TransactionMessage {
        account_number: account.to_string(),
        amount,
        direction: TransactionDirection::from(kind),
        timestamp: None,
        notes: String::new(),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = BankClient::new(&cli.api_url);
    if let Some(id) = cli.client_id {
        client = client.with_client_id(id);
    }

    match run(&client, cli.command).await {
        Err(e) => match e.downcast_ref::<ClientError>().and_then(ClientError::status) {
            Some(status) => {
                eprintln!("✗ {}", status);
                eprintln!("{}", serde_json::to_string_pretty(status)?);
                std::process::exit(1);
            }
            None => Err(e),
        },
        ok => ok,
    }
}

async fn run(client: &BankClient, command: Commands) -> Result<()> {
    match command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Account { action } => match action {
            AccountCommands::Create {
                number,
                name,
                currency,
            } => {
                let currency = parse_currency(&currency)?;
                print_json(&client.create_account(&number, &name, currency).await?)?;
            }
            AccountCommands::Get { number } => {
                print_json(&client.get_account(&number).await?)?;
            }
            AccountCommands::Balance { number } => {
                print_json(&client.get_balance(&number).await?)?;
            }
            AccountCommands::History { number } => {
                print_json(&client.list_transactions(&number).await?)?;
            }
        },

        Commands::Rates { from, to, count } => {
            let mut feed = client.exchange_rates(&from, &to).await?;
            let mut received = 0;
            while count.is_none_or(|limit| received < limit) {
                match feed.recv().await? {
                    Some(rate) => {
                        println!(
                            "{}  {} -> {}  {}",
                            rate.timestamp, rate.from_currency, rate.to_currency, rate.rate
                        );
                        received += 1;
                    }
                    None => break,
                }
            }
            feed.close().await?;
        }

        Commands::Summarize {
            account,
            transactions,
        } => {
            let messages = transactions
                .iter()
                .map(|raw| parse_transaction(&account, raw))
                .collect::<Result<Vec<_>>>()?;
            print_json(&client.summarize(&messages).await?)?;
        }

        Commands::Transfer { action } => match action {
            TransferCommands::Send {
                from,
                to,
                currency,
                amounts,
                notes,
            } => {
                let requests: Vec<TransferRequest> = amounts
                    .into_iter()
                    .map(|amount| TransferRequest {
                        from_account: from.clone(),
                        to_account: to.clone(),
                        currency: currency.clone(),
                        amount,
                        notes: notes.clone(),
                    })
                    .collect();
                print_json(&client.transfer_multiple(&requests).await?)?;
            }
            TransferCommands::Get { id } => {
                let id: TransferId = id
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid transfer ID: {}", id))?;
                print_json(&client.get_transfer(id).await?)?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction() {
        let msg = parse_transaction("1001", "out:40.5").unwrap();
        assert_eq!(msg.direction, TransactionDirection::Out);
        assert_eq!(msg.amount, Decimal::new(405, 1));

        let unknown = parse_transaction("1001", "REFUND:1").unwrap();
        assert_eq!(unknown.direction, TransactionDirection::Unknown);

        assert!(parse_transaction("1001", "IN").is_err());
        assert!(parse_transaction("1001", "IN:abc").is_err());
    }

    #[test]
    fn test_cli_parses_transfer_send() {
        let cli = Cli::try_parse_from([
            "bank", "transfer", "send", "--from", "1001", "--to", "1002", "--currency", "IDR",
            "--amount", "5000", "--amount", "2500",
        ])
        .unwrap();

        match cli.command {
            Commands::Transfer {
                action: TransferCommands::Send { amounts, .. },
            } => assert_eq!(amounts.len(), 2),
            _ => panic!("expected transfer send"),
        }
    }
}
