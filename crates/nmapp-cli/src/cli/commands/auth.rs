//! Login, registration, logout and status.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use nmapp_core::api::{ApiClient, Registration};
use nmapp_core::config::Config;
use nmapp_core::session::{Session, mask_token};

use super::navigation_root;

pub async fn login(config: &Config, user: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let client = ApiClient::from_config(config)?;
    let mut root = navigation_root(config);
    let session = root.login(&client, user, &password).await?;
    print_welcome(&session);
    Ok(())
}

pub async fn register(config: &Config, registration: &Registration) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let mut root = navigation_root(config);
    let session = root.register(&client, registration).await?;
    println!("Account created.");
    print_welcome(&session);
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let mut root = navigation_root(config);
    let was_logged_in = root.session().is_some();
    root.logout().context("clear session")?;
    if was_logged_in {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let root = navigation_root(config);
    let Some(session) = root.session() else {
        println!("Not logged in.");
        return Ok(());
    };

    let user = &session.user;
    println!("Logged in as {} ({})", user.display_name(), user.username);
    println!("User ID: {}", user.id);
    if !user.email.is_empty() {
        println!("Email: {}", user.email);
    }
    println!("Token: {}", mask_token(&session.access_token));
    println!("Server: {}", config.effective_base_url()?);
    Ok(())
}

fn print_welcome(session: &Session) {
    println!(
        "Welcome, {} ({})",
        session.user.display_name(),
        session.user.username
    );
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().context("flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
