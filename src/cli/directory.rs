//! User directory CLI commands

use clap::Subcommand;

use crate::auth::LocalDirectory;
use crate::config::{LedgerPaths, Settings};
use crate::error::LedgerResult;

use super::session;

/// Directory subcommands
#[derive(Subcommand)]
pub enum DirectoryCommands {
    /// Add a user, or replace an existing user's password and groups
    AddUser {
        /// Username
        username: String,
        /// Group to place the user in (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,
        /// Also place the user in the administrator group
        #[arg(long)]
        admin: bool,
    },
    /// List users and their groups
    List,
}

/// Groups for a new user: explicit ones, else the teller group
fn resolve_groups(settings: &Settings, mut groups: Vec<String>, admin: bool) -> Vec<String> {
    if groups.is_empty() {
        groups.push(settings.teller_group.clone());
    }
    if admin && !groups.iter().any(|g| g == &settings.admin_group) {
        groups.push(settings.admin_group.clone());
    }
    groups
}

/// Handle a directory command
pub fn handle_directory_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: DirectoryCommands,
) -> LedgerResult<()> {
    paths.ensure_directories()?;
    let mut directory = LocalDirectory::open(paths.directory_file(), settings.kdf)?;

    match cmd {
        DirectoryCommands::AddUser {
            username,
            groups,
            admin,
        } => {
            let groups = resolve_groups(settings, groups, admin);
            let password = session::prompt_new_password()?;

            directory.upsert_user(&username, password.as_bytes(), &groups)?;
            directory.save()?;

            println!("Saved user: {}", username.trim());
            println!("  Groups: {}", groups.join(", "));
        }

        DirectoryCommands::List => {
            if directory.users().is_empty() {
                println!("No users found.");
            }
            for user in directory.users() {
                println!("{:<24}  {}", user.username, user.groups.join(", "));
            }
        }
    }

    Ok(())
}
