//! Command implementations, one module per area.

mod auth;
mod pipelines;
mod resources;

use std::path::Path;

use anyhow::{Context as _, Result};
use pipedeck_core::models::PageQuery;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cli::{Command, PageArgs};
use crate::context::Context;

pub async fn run(ctx: &mut Context, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => auth::login(ctx, username).await,
        Command::Logout => auth::logout(ctx).await,
        Command::Whoami => auth::whoami(ctx).await,
        Command::Register {
            username,
            name,
            email,
            phone,
        } => auth::register(ctx, username, name, email, phone).await,
        Command::Profile { command } => auth::profile(ctx, command).await,
        Command::Passwd => auth::passwd(ctx).await,
        Command::Open { path } => auth::open(ctx, &path).await,
        Command::Pipelines { command } => pipelines::run(ctx, command).await,
        Command::Artifacts { command } => resources::artifacts(ctx, command).await,
        Command::Dashboard { limit } => resources::dashboard(ctx, limit).await,
        Command::Hpa { command } => resources::hpa(ctx, command).await,
        Command::Clusters { command } => resources::clusters(ctx, command).await,
        Command::System { command } => resources::system(ctx, command).await,
    }
}

impl From<PageArgs> for PageQuery {
    fn from(args: PageArgs) -> Self {
        PageQuery::new(args.page, args.page_size)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_page_footer(page: i64, total_pages: i64, total: i64) {
    if total_pages > 1 {
        println!("\npage {} of {} ({} total)", page, total_pages, total);
    }
}
