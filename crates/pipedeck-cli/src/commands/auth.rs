use std::io::{self, Write};

use anyhow::{bail, Result};
use pipedeck_core::models::{ProfileUpdate, Registration};
use pipedeck_core::{RouteDecision, SessionError};

use super::print_json;
use crate::cli::ProfileCommand;
use crate::context::Context;

const PROFILE_PATH: &str = "/profile";

/// Keep the typed error as the source so a 401 can still be recognised,
/// but lead with the store's message.
fn session_failure(ctx: &Context, error: SessionError) -> anyhow::Error {
    let message = ctx
        .session
        .last_error()
        .unwrap_or_else(|| error.to_string());
    anyhow::Error::new(error).context(message)
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    Ok(match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn password_from_env_or_prompt(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var("PIPEDECK_PASSWORD") {
        return Ok(password);
    }
    Ok(rpassword::prompt_password(prompt)?)
}

pub async fn login(ctx: &mut Context, username: Option<String>) -> Result<()> {
    ctx.restore().await?;
    let username = match username {
        Some(username) => username,
        None => prompt_username(ctx.config.last_username.as_deref())?,
    };
    let password = password_from_env_or_prompt("Password: ")?;

    let profile = match ctx.session.login(&username, &password).await {
        Ok(profile) => profile,
        Err(e) => return Err(session_failure(ctx, e)),
    };
    ctx.remember_username(&username);

    println!("Logged in as {}", profile.display_name());
    Ok(())
}

pub async fn logout(ctx: &mut Context) -> Result<()> {
    ctx.restore().await?;
    let was_authenticated = ctx.session.is_authenticated();
    ctx.session.logout().await;
    if was_authenticated {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

pub async fn whoami(ctx: &mut Context) -> Result<()> {
    ctx.enter(PROFILE_PATH).await?;
    match ctx.session.profile() {
        Some(profile) => {
            println!("{} <{}>", profile.display_name(), profile.email);
            if let Some(role) = profile.role() {
                println!("role: {}", role);
            }
        }
        None => println!("Logged in (profile unavailable)"),
    }
    Ok(())
}

pub async fn register(
    ctx: &mut Context,
    username: String,
    name: String,
    email: String,
    phone: Option<String>,
) -> Result<()> {
    let password = password_from_env_or_prompt("New password: ")?;
    if std::env::var("PIPEDECK_PASSWORD").is_err() {
        let confirm = rpassword::prompt_password("Repeat password: ")?;
        if confirm != password {
            bail!("Passwords do not match");
        }
    }
    let registration = Registration {
        username,
        password,
        name,
        email,
        phone,
    };
    ctx.api.register(&registration).await?;
    println!("Account {} created, run `pipedeck login` to continue", registration.username);
    Ok(())
}

pub async fn profile(ctx: &mut Context, command: ProfileCommand) -> Result<()> {
    ctx.enter(PROFILE_PATH).await?;
    match command {
        ProfileCommand::Update {
            name,
            email,
            phone,
            avatar,
        } => {
            let update = ProfileUpdate {
                name,
                email,
                phone,
                avatar,
                ..ProfileUpdate::default()
            };
            if update.is_empty() {
                bail!("Nothing to update; pass at least one of --name, --email, --phone, --avatar");
            }
            match ctx.session.update_profile(&update).await {
                Ok(profile) => print_json(&profile),
                Err(e) => Err(session_failure(ctx, e)),
            }
        }
    }
}

pub async fn passwd(ctx: &mut Context) -> Result<()> {
    ctx.enter(PROFILE_PATH).await?;
    let old = rpassword::prompt_password("Current password: ")?;
    let new = rpassword::prompt_password("New password: ")?;
    let confirm = rpassword::prompt_password("Repeat new password: ")?;
    if new != confirm {
        bail!("Passwords do not match");
    }
    if let Err(e) = ctx.session.change_password(&old, &new).await {
        return Err(session_failure(ctx, e));
    }
    println!("Password changed");
    Ok(())
}

pub async fn open(ctx: &mut Context, path: &str) -> Result<()> {
    ctx.restore().await?;
    match ctx.router.navigate(path, ctx.session.is_authenticated()) {
        RouteDecision::Proceed(route) => println!("{} ({})", route.title, route.path),
        RouteDecision::Redirect(navigation) => println!("redirect -> {}", navigation.path()),
        RouteDecision::NotFound => bail!("No page at {}", path),
    }
    Ok(())
}
