//! Account display formatting
//!
//! Formats accounts for terminal output. Address fields and the town are
//! masked; the full values are never needed for balance, lodgement or
//! withdrawal work.

use crate::models::{Account, AccountKind};

/// Mask the middle of a value, keeping the first and last two characters
///
/// Values of four characters or fewer are masked completely; blank values
/// render as empty.
pub fn mask_pii(value: &str) -> String {
    let value = value.trim();
    let chars: Vec<char> = value.chars().collect();

    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }

    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..2]);
    masked.push_str(&"*".repeat(chars.len() - 4));
    masked.extend(&chars[chars.len() - 2..]);
    masked
}

/// Format a single account's details
pub fn format_account_details(account: &Account, currency_symbol: &str) -> String {
    let holder = &account.holder;
    let mut output = String::new();

    output.push_str(&format!("Account No:     {}\n", account.id));
    output.push_str(&format!("Type:           {}\n", account.kind));
    output.push_str(&format!("Name:           {}\n", holder.name));
    output.push_str(&format!("Address Line 1: {}\n", mask_pii(&holder.address_line_1)));
    output.push_str(&format!("Address Line 2: {}\n", mask_pii(&holder.address_line_2)));
    output.push_str(&format!("Address Line 3: {}\n", mask_pii(&holder.address_line_3)));
    output.push_str(&format!("Town:           {}\n", mask_pii(&holder.town)));
    output.push_str(&format!(
        "Balance:        {}\n",
        account.balance.format_with_symbol(currency_symbol)
    ));

    match account.kind {
        AccountKind::Current { overdraft_limit } => output.push_str(&format!(
            "Overdraft:      {}\n",
            overdraft_limit.format_with_symbol(currency_symbol)
        )),
        AccountKind::Savings { interest_rate } => {
            output.push_str(&format!("Interest Rate:  {}%\n", interest_rate))
        }
    }

    output.push_str(&format!(
        "Available:      {}\n",
        account.available_funds().format_with_symbol(currency_symbol)
    ));

    output
}

/// Format a list of accounts as a table with masked holder names
pub fn format_account_list(accounts: &[Account], currency_symbol: &str) -> String {
    if accounts.is_empty() {
        return "No accounts found.".to_string();
    }

    let names: Vec<String> = accounts.iter().map(|a| mask_pii(&a.holder.name)).collect();
    let name_width = names
        .iter()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<36}  {:<name_width$}  {:<15}  {:>14}\n",
        "Account No",
        "Name",
        "Type",
        "Balance",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<36}  {:-<name_width$}  {:-<15}  {:->14}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for (account, name) in accounts.iter().zip(&names) {
        output.push_str(&format!(
            "{:<36}  {:<name_width$}  {:<15}  {:>14}\n",
            account.id.to_string(),
            name,
            account.kind.to_string(),
            account.balance.format_with_symbol(currency_symbol),
            name_width = name_width,
        ));
    }

    output
}
