//! Interactive prompts shared by CLI commands
//!
//! Usernames and confirmations are read from stdin; passwords are read with
//! `rpassword` so they are never echoed.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::auth::{
    ApprovalGate, AttemptFailure, CredentialValidator, Credentials, LocalDirectory, LoginGate,
};
use crate::crypto::IdentityScope;
use crate::error::{LedgerError, LedgerResult};
use crate::models::Account;
use crate::services::Ledger;

/// Print `label` and read one trimmed line from stdin
///
/// Returns `None` at end of input.
pub fn prompt_line(label: &str) -> LedgerResult<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask a yes/no question; anything other than `y`/`yes` is a no
pub fn confirm(question: &str) -> LedgerResult<bool> {
    let answer = prompt_line(&format!("{} [y/N]: ", question))?;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}

/// Read a username and password; an empty username cancels
pub fn prompt_credentials(heading: &str, attempt: u32) -> Option<Credentials> {
    println!("{} (attempt {})", heading, attempt);

    let username = match prompt_line("  Username: ") {
        Ok(Some(name)) if !name.is_empty() => name,
        _ => return None,
    };
    let password = rpassword::prompt_password("  Password: ").ok()?;

    Some(Credentials::new(username, password))
}

/// Read a new password twice
pub fn prompt_new_password() -> LedgerResult<String> {
    let first = rpassword::prompt_password("New password: ")?;
    let second = rpassword::prompt_password("Confirm password: ")?;

    if first != second {
        return Err(LedgerError::Validation("Passwords do not match".into()));
    }
    if first.is_empty() {
        return Err(LedgerError::Validation("Password cannot be empty".into()));
    }
    Ok(first)
}

fn report_failure(failure: AttemptFailure, remaining: u32) {
    let message = match failure {
        AttemptFailure::BadCredentials => "Invalid username or password.",
        AttemptFailure::NotInGroup => "That user is not allowed to do this.",
        AttemptFailure::DirectoryError => "The user directory could not be checked.",
    };
    eprintln!("{} {} attempt(s) remaining.", message, remaining);
}

/// Validator backed by the ledger's local directory file
pub fn directory_validator(ledger: &Ledger) -> LedgerResult<Arc<dyn CredentialValidator>> {
    let directory = LocalDirectory::open(ledger.paths().directory_file(), ledger.settings().kdf)?;
    Ok(Arc::new(directory))
}

/// Resolve the acting teller
///
/// The teller signs in through the login gate unless the settings turn
/// `require_login` off and `login` was not asked for, in which case the OS
/// user running the command acts as the teller.
pub fn resolve_teller(ledger: &Ledger, login: bool) -> LedgerResult<String> {
    if !ledger.settings().sign_in_required(login) {
        return Ok(IdentityScope::current()?.user);
    }

    let gate = LoginGate::new(
        directory_validator(ledger)?,
        ledger.audit().clone(),
        ledger.settings().teller_group.clone(),
    );

    gate.authenticate(
        |attempt| prompt_credentials("Teller sign-in", attempt),
        report_failure,
    )
    .ok_or_else(|| LedgerError::Validation("Sign-in failed".into()))
}

/// Prompt for administrator approval through the approval gate
pub fn request_approval(
    ledger: &Ledger,
    validator: Arc<dyn CredentialValidator>,
    account: &Account,
) -> Option<String> {
    let gate = ApprovalGate::new(
        validator,
        ledger.audit().clone(),
        ledger.settings().admin_group.clone(),
    );

    println!(
        "Closing account {} requires administrator approval.",
        account.id
    );
    gate.approve(
        |attempt| prompt_credentials("Administrator approval", attempt),
        report_failure,
    )
}
