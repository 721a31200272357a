use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use teller_ledger::cli::{
    handle_account_command, handle_directory_command, session, AccountCommands, DirectoryCommands,
};
use teller_ledger::config::{paths::DATA_DIR_ENV, LedgerPaths, Settings};
use teller_ledger::logging::init_logging;
use teller_ledger::services::Ledger;
use teller_ledger::LedgerError;

#[derive(Parser)]
#[command(
    name = "teller",
    version,
    about = "Encrypted account ledger for bank tellers",
    long_about = "Teller Ledger keeps customer accounts in a local database with \
                  every holder field and balance encrypted, and records each \
                  teller action in an audit trail."
)]
struct Cli {
    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Sign in against the user directory even when settings allow acting as the OS user
    #[arg(long, global = true)]
    login: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Account operations
    #[command(subcommand)]
    Account(AccountCommands),

    /// User directory management
    #[command(subcommand)]
    Directory(DirectoryCommands),

    /// Initialize the ledger: settings, encryption key and database
    Init,

    /// Show current configuration and paths
    Config,
}

fn run(cli: Cli) -> Result<()> {
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Account(cmd)) => {
            let ledger = Ledger::open(paths, settings)?;
            let teller = session::resolve_teller(&ledger, cli.login)?;
            handle_account_command(&ledger, &teller, cmd)?;
        }
        Some(Commands::Directory(cmd)) => {
            handle_directory_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing Teller Ledger at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            let ledger = Ledger::open(paths, settings)?;
            println!("Initialization complete!");
            println!();
            println!("  Database:       {}", ledger.paths().database_file().display());
            println!("  Encryption key: {}", ledger.paths().key_file().display());
            println!("  User secret:    {}", ledger.paths().user_secret_file().display());
            println!("  Accounts:       {}", ledger.load_report().loaded);
            println!();
            println!("Run 'teller directory add-user <name>' to add a teller.");
            println!("Run 'teller directory add-user <name> --admin' to add an administrator.");
        }
        Some(Commands::Config) => {
            println!("Teller Ledger Configuration");
            println!("===========================");
            println!("Data directory:   {}", paths.base_dir().display());
            println!("  (override with {})", DATA_DIR_ENV);
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Database:         {}", paths.database_file().display());
            println!("Encryption key:   {}", paths.key_file().display());
            println!("User secret:      {}", paths.user_secret_file().display());
            println!("Audit fallback:   {}", paths.audit_fallback_file().display());
            println!("User directory:   {}", paths.directory_file().display());
            println!("Initialized:      {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Event source:   {}", settings.event_source);
            println!("  Teller group:   {}", settings.teller_group);
            println!("  Admin group:    {}", settings.admin_group);
            println!("  Strict tokens:  {}", settings.strict_tokens);
            println!("  Require login:  {}", settings.require_login);
            println!("  Max text:       {}", settings.limits.max_text_length);
            println!("  Max amount:     {}", settings.limits.max_transaction_amount);
            println!("  Reason above:   {}", settings.limits.reason_threshold);
        }
        None => {
            println!("Teller Ledger - encrypted account ledger");
            println!();
            println!("Run 'teller --help' for usage information.");
            println!("Run 'teller init' to set up a new ledger.");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "command failed");
            match e.downcast_ref::<LedgerError>() {
                Some(ledger_error) => eprintln!("Error: {}", ledger_error.user_message()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
