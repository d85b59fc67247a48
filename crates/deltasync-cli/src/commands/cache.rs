//! Cache command - Inspect and reset persisted sync state
//!
//! Provides the `deltasync cache` CLI command which:
//! 1. Lists users with persisted state
//! 2. Lists the cached folders or one folder's cached messages
//! 3. Resets the folders or one folder's messages so the next sync
//!    starts again from sync key 0

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::{info, warn};

use deltasync_cache::InMemoryStore;
use deltasync_core::config::Config;
use deltasync_core::domain::{Folder, FolderId, Message};
use deltasync_core::ports::IStore;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List users with persisted state
    Users,
    /// List cached folders
    Folders {
        /// Account name (defaults to account.username)
        #[arg(long)]
        user: Option<String>,
    },
    /// List cached messages of a folder
    Messages {
        /// Account name (defaults to account.username)
        #[arg(long)]
        user: Option<String>,
        /// Folder id
        #[arg(long)]
        folder: String,
    },
    /// Reset cached folders, or one folder's messages
    Reset {
        /// Account name (defaults to account.username)
        #[arg(long)]
        user: Option<String>,
        /// Only reset this folder's messages
        #[arg(long)]
        folder: Option<String>,
    },
}

impl CacheCommand {
    /// Execute the cache command
    pub fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = open_store(config)?;

        match self {
            CacheCommand::Users => show_users(&store, formatter.as_ref(), format),
            CacheCommand::Folders { user } => {
                let user = resolve_user(user.as_deref(), config)?;
                show_folders(&store, &user, formatter.as_ref(), format)
            }
            CacheCommand::Messages { user, folder } => {
                let user = resolve_user(user.as_deref(), config)?;
                let folder_id = parse_folder_id(folder)?;
                show_messages(&store, &user, &folder_id, formatter.as_ref(), format)
            }
            CacheCommand::Reset { user, folder } => {
                let user = resolve_user(user.as_deref(), config)?;
                let folder_id = folder.as_deref().map(parse_folder_id).transpose()?;
                reset(&store, &user, folder_id.as_ref(), formatter.as_ref(), format)
            }
        }
    }
}

/// Loads every persisted state; changes are written back
fn open_store(config: &Config) -> Result<InMemoryStore> {
    if !config.cache.persist {
        warn!("cache.persist is off; nothing is read from or written to disk");
    }
    InMemoryStore::from_config(&config.cache).with_context(|| {
        format!(
            "Failed to load cache state from {}",
            config.cache.state_dir.display()
        )
    })
}

fn resolve_user(explicit: Option<&str>, config: &Config) -> Result<String> {
    explicit
        .map(str::to_string)
        .or_else(|| config.account.username.clone())
        .context("No user given. Pass --user or set account.username in the configuration.")
}

fn parse_folder_id(raw: &str) -> Result<FolderId> {
    raw.parse()
        .with_context(|| format!("Invalid folder id '{}'", raw))
}

fn show_users(
    store: &InMemoryStore,
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let mut users = store.usernames();
    users.sort();

    if format.is_json() {
        formatter.print_json(&serde_json::json!({ "users": users }));
    } else {
        formatter.list("Users", &users);
    }
    Ok(())
}

fn show_folders(
    store: &InMemoryStore,
    user: &str,
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let mut folders = store.folders(user);
    folders.sort_by(|a, b| a.name().cmp(b.name()));
    let sync_key = store.folders_sync_key(user);

    info!(%user, count = folders.len(), "Listing cached folders");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "user": user,
            "sync_key": sync_key.as_str(),
            "folders": serde_json::to_value(&folders).context("Failed to serialize folders")?,
        }));
    } else {
        let lines: Vec<String> = folders.iter().map(folder_line).collect();
        formatter.list(&format!("Folders of {} (sync key {})", user, sync_key), &lines);
    }
    Ok(())
}

fn show_messages(
    store: &InMemoryStore,
    user: &str,
    folder_id: &FolderId,
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let mut messages = store.messages(user, folder_id);
    messages.sort_by(|a, b| b.date_received().cmp(&a.date_received()));
    let sync_key = store
        .state(user)
        .and_then(|state| state.messages_sync_key(folder_id).cloned())
        .unwrap_or_default();

    info!(%user, %folder_id, count = messages.len(), "Listing cached messages");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "user": user,
            "folder": folder_id.as_str(),
            "sync_key": sync_key.as_str(),
            "messages": serde_json::to_value(&messages).context("Failed to serialize messages")?,
        }));
    } else {
        let lines: Vec<String> = messages.iter().map(message_line).collect();
        formatter.list(
            &format!("Messages in {} (sync key {})", folder_id, sync_key),
            &lines,
        );
    }
    Ok(())
}

fn reset(
    store: &InMemoryStore,
    user: &str,
    folder_id: Option<&FolderId>,
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let target = match folder_id {
        Some(folder_id) => {
            store.reset_messages(user, folder_id);
            format!("messages of folder {}", folder_id)
        }
        None => {
            store.reset_folders(user);
            "folders".to_string()
        }
    };

    info!(%user, %target, "Reset cache");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "user": user,
            "reset": target,
        }));
    } else {
        formatter.success(&format!("Reset {} for {}", target, user));
        formatter.info("The next sync starts from sync key 0.");
    }
    Ok(())
}

fn folder_line(folder: &Folder) -> String {
    match folder.parent_id() {
        Some(parent) => format!("{:<30} {} (in {})", folder.name(), folder.id(), parent),
        None => format!("{:<30} {}", folder.name(), folder.id()),
    }
}

fn message_line(message: &Message) -> String {
    let mut flags = String::new();
    if !message.is_read() {
        flags.push('*');
    }
    if message.has_attachments() {
        flags.push('@');
    }
    format!(
        "{} {:<2} {:<30} {}",
        message.date_received().format("%Y-%m-%d %H:%M"),
        flags,
        message.from(),
        message.subject()
    )
}
