//! taskshare - a command-line client for shared task groups.
//!
//! Lists groups and their members from the local cache when possible,
//! falling back to the backend.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskshare_core::{
    ApiClient, Config, FetchOptions, FileStore, GroupsContext, IdentitySignal, Member, NewGroup,
    Session, SessionData,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent member fetches for `members --all`.
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Subdirectory of the cache dir holding persisted member lists.
const MEMBERS_STORE_DIR: &str = "members";

const USAGE: &str = "\
Usage: taskshare <command>

Commands:
  groups                       List your groups
  members <group-id> [--force] List members of a group
  members --all                List members of every group
  create <name>                Create a group
  join <code>                  Join a group with an invitation code
  leave <group-id>             Leave a group
  login <token> <user-id> [name]
  logout";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    debug!(?cache_dir, "Cache directory configured");

    let mut session = Session::new(cache_dir.clone());
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load session");
    }

    match (command.as_str(), &args[1..]) {
        ("login", [token, user_id, rest @ ..]) => {
            let name = rest.first().cloned();
            session.update(SessionData::new(token.clone(), user_id.clone(), name));
            session.save().context("Failed to save session")?;
            println!("Signed in as {}", user_id);
            Ok(())
        }
        ("login", _) => {
            println!("{}", USAGE);
            Ok(())
        }
        ("logout", []) => {
            session.clear().context("Failed to clear session")?;
            println!("Signed out");
            Ok(())
        }
        (_, rest) => {
            let ctx = build_context(&config, &session, cache_dir)?;
            if ctx.identity().current().is_none() {
                bail!("Not signed in. Run `taskshare login <token> <user-id>` first.");
            }
            let result = run_command(&ctx, command, rest).await;
            // Let refreshes started from cached snapshots land before exiting
            ctx.members_cache().wait_for_background().await;
            result
        }
    }
}

fn build_context(config: &Config, session: &Session, cache_dir: PathBuf) -> Result<GroupsContext> {
    let base_url = std::env::var("TASKSHARE_API_URL")
        .ok()
        .or_else(|| config.api_base_url.clone())
        .context("No backend configured. Set TASKSHARE_API_URL or api_base_url in config.json")?;

    let mut api = ApiClient::new(&base_url)?;
    if let Some(key) = std::env::var("TASKSHARE_API_KEY")
        .ok()
        .or_else(|| config.api_key.clone())
    {
        api.set_api_key(key);
    }
    if let Some(token) = std::env::var("TASKSHARE_TOKEN")
        .ok()
        .or_else(|| session.token().map(str::to_string))
    {
        api.set_token(token);
    }

    let store = FileStore::new(cache_dir.join(MEMBERS_STORE_DIR))?;

    let identity = IdentitySignal::new();
    if let Some(user) = session.identity() {
        identity.sign_in(user);
    }

    Ok(GroupsContext::new(
        Arc::new(api),
        Arc::new(store),
        config.cache_settings(),
        identity,
    ))
}

async fn run_command(ctx: &GroupsContext, command: &str, args: &[String]) -> Result<()> {
    match (command, args) {
        ("groups", []) => {
            ctx.refresh_groups().await;
            let groups = ctx.groups();
            if groups.is_empty() {
                println!("No groups");
            }
            for group in groups {
                println!(
                    "{:<24} {:<30} {:>12} {:>4} pending",
                    group.id,
                    group.name,
                    group.display_member_count(),
                    group.pending_task_count
                );
            }
        }
        ("members", [flag]) if flag == "--all" => {
            ctx.refresh_groups().await;
            let results: Vec<_> = stream::iter(ctx.groups())
                .map(|group| async move {
                    let members = ctx.get_members(&group.id, FetchOptions::default()).await;
                    (group, members)
                })
                .buffer_unordered(MAX_CONCURRENT_REQUESTS)
                .collect()
                .await;

            for (group, members) in results {
                println!("{} ({})", group.name, group.id);
                print_members(&members);
            }
        }
        ("members", [group_id, rest @ ..]) => {
            let force = rest.iter().any(|a| a == "--force");
            if let Some(age) = ctx.members_cache().persisted_age(group_id).await {
                info!(group_id = %group_id, age = %age, "Cached members available");
            }
            let members = ctx.get_members(group_id, FetchOptions { force }).await;
            print_members(&members);
        }
        ("create", [name]) => {
            let group = ctx.create_group(&NewGroup::named(name.as_str())).await?;
            match group.join_code {
                Some(ref code) => println!("Created {} ({}), join code {}", group.name, group.id, code),
                None => println!("Created {} ({})", group.name, group.id),
            }
        }
        ("join", [code]) => {
            ctx.join_group_by_code(code).await?;
            println!("Joined. You are now in {} groups", ctx.groups().len());
        }
        ("leave", [group_id]) => {
            ctx.leave_group(group_id).await?;
            println!("Left {}", group_id);
        }
        _ => {
            println!("{}", USAGE);
        }
    }
    Ok(())
}

fn print_members(members: &[Member]) {
    if members.is_empty() {
        println!("  (no members)");
        return;
    }
    for member in members {
        let marker = if member.is_admin() { " [admin]" } else { "" };
        println!("  {}{}", member.display_name(), marker);
    }
}
