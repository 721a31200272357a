//! Account CLI commands
//!
//! Implements CLI commands for teller work on accounts.

use clap::{Args, Subcommand};

use crate::audit::Outcome;
use crate::display::account::{format_account_details, format_account_list};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, AccountKind, Money};
use crate::services::{Ledger, NewAccount, TellerService};

use super::session;

/// Symbol used when printing balances
pub const CURRENCY_SYMBOL: &str = "€";

/// Holder details shared by both open commands
#[derive(Args)]
pub struct HolderArgs {
    /// Account holder's name
    #[arg(long)]
    name: String,
    /// First address line
    #[arg(long = "address-1")]
    address_line_1: String,
    /// Second address line
    #[arg(long = "address-2", default_value = "")]
    address_line_2: String,
    /// Third address line
    #[arg(long = "address-3", default_value = "")]
    address_line_3: String,
    /// Town
    #[arg(long)]
    town: String,
    /// Opening balance (e.g., "250.00" or "250")
    #[arg(short, long, default_value = "0")]
    balance: String,
}

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a current account
    OpenCurrent {
        #[command(flatten)]
        holder: HolderArgs,
        /// Overdraft limit
        #[arg(short, long, default_value = "0")]
        overdraft: String,
    },
    /// Open a savings account
    OpenSavings {
        #[command(flatten)]
        holder: HolderArgs,
        /// Interest rate in percent
        #[arg(short, long, default_value = "0")]
        interest_rate: f64,
    },
    /// Show account details
    Show {
        /// Account number
        account: String,
    },
    /// Lodge money into an account
    Lodge {
        /// Account number
        account: String,
        /// Amount (e.g., "50.00")
        amount: String,
        /// Reason, required above the configured threshold
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Withdraw money from an account
    Withdraw {
        /// Account number
        account: String,
        /// Amount (e.g., "50.00")
        amount: String,
        /// Reason, required above the configured threshold
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Close an account (requires administrator approval)
    Close {
        /// Account number
        account: String,
    },
    /// List all accounts
    List,
}

fn parse_amount(field: &str, value: &str) -> LedgerResult<Money> {
    Money::parse(value).map_err(|e| {
        LedgerError::InvalidAmount(format!(
            "Invalid {} '{}'. Use format like '100.00' or '100'. Error: {}",
            field, value, e
        ))
    })
}

fn new_account(holder: HolderArgs, kind: AccountKind) -> LedgerResult<NewAccount> {
    Ok(NewAccount {
        opening_balance: parse_amount("balance", &holder.balance)?,
        name: holder.name,
        address_line_1: holder.address_line_1,
        address_line_2: holder.address_line_2,
        address_line_3: holder.address_line_3,
        town: holder.town,
        kind,
    })
}

/// Current balance without recording an account query
fn current_balance(ledger: &Ledger, account_no: &str) -> Option<Money> {
    let id = AccountId::parse(account_no).ok()?;
    ledger
        .store()
        .find_by_id(id)
        .ok()
        .flatten()
        .map(|a| a.balance)
}

fn report_outcome(ledger: &Ledger, account_no: &str, outcome: &Outcome, verb: &str) {
    match outcome {
        Outcome::Success => {
            println!("{} complete.", verb);
            if let Some(balance) = current_balance(ledger, account_no) {
                println!(
                    "  New balance: {}",
                    balance.format_with_symbol(CURRENCY_SYMBOL)
                );
            }
        }
        Outcome::AccountNotFound => println!("Account {} does not exist.", account_no.trim()),
        Outcome::InsufficientFunds => println!("Insufficient funds; no money was withdrawn."),
        other => println!("{} failed: {}", verb, other),
    }
}

/// Handle an account command on behalf of `teller`
pub fn handle_account_command(ledger: &Ledger, teller: &str, cmd: AccountCommands) -> LedgerResult<()> {
    let service: TellerService<'_> = ledger.teller(teller);

    match cmd {
        AccountCommands::OpenCurrent { holder, overdraft } => {
            let overdraft_limit = parse_amount("overdraft", &overdraft)?;
            let request = new_account(holder, AccountKind::Current { overdraft_limit })?;
            let account = service.open_account(request)?;

            println!("Opened current account: {}", account.id);
            println!(
                "  Balance:   {}",
                account.balance.format_with_symbol(CURRENCY_SYMBOL)
            );
            println!(
                "  Overdraft: {}",
                overdraft_limit.format_with_symbol(CURRENCY_SYMBOL)
            );
        }

        AccountCommands::OpenSavings {
            holder,
            interest_rate,
        } => {
            let request = new_account(holder, AccountKind::Savings { interest_rate })?;
            let account = service.open_account(request)?;

            println!("Opened savings account: {}", account.id);
            println!(
                "  Balance:       {}",
                account.balance.format_with_symbol(CURRENCY_SYMBOL)
            );
            println!("  Interest Rate: {}%", interest_rate);
        }

        AccountCommands::Show { account } => {
            let found = service
                .view_account(&account)?
                .ok_or_else(|| LedgerError::account_not_found(account.trim()))?;
            print!("{}", format_account_details(&found, CURRENCY_SYMBOL));
        }

        AccountCommands::Lodge {
            account,
            amount,
            reason,
        } => {
            let amount = parse_amount("amount", &amount)?;
            let outcome = service.lodge(&account, amount, reason.as_deref())?;
            report_outcome(ledger, &account, &outcome, "Lodgement");
        }

        AccountCommands::Withdraw {
            account,
            amount,
            reason,
        } => {
            let amount = parse_amount("amount", &amount)?;
            let outcome = service.withdraw(&account, amount, reason.as_deref())?;
            report_outcome(ledger, &account, &outcome, "Withdrawal");
        }

        AccountCommands::Close { account } => {
            let validator = session::directory_validator(ledger)?;
            let outcome = service.close_account(
                &account,
                |found| session::request_approval(ledger, validator, found),
                |found| {
                    print!("{}", format_account_details(found, CURRENCY_SYMBOL));
                    session::confirm("Close this account?").unwrap_or(false)
                },
            )?;

            match outcome {
                Outcome::Success => println!("Account {} closed.", account.trim()),
                Outcome::AccountNotFound => {
                    println!("Account {} does not exist.", account.trim())
                }
                Outcome::AdminApprovalDenied => {
                    println!("Administrator approval was not granted; the account is still open.")
                }
                Outcome::CancelledByUser => println!("Closure cancelled."),
                other => println!("Closure failed: {}", other),
            }
        }

        AccountCommands::List => {
            let accounts = service.list_accounts()?;
            print!("{}", format_account_list(&accounts, CURRENCY_SYMBOL));
        }
    }

    Ok(())
}
