pub mod auth;
pub mod config;
pub mod history;
pub mod report;
pub mod telemetry;

use anyhow::{Result, bail};
use nmapp_core::api::ApiClient;
use nmapp_core::config::Config;
use nmapp_core::navigation::NavigationRoot;
use nmapp_core::session::{FileSessionStore, Session};

/// Activated root over the session file in `NMAPP_HOME`.
fn navigation_root(config: &Config) -> NavigationRoot<FileSessionStore> {
    let mut root = NavigationRoot::new(FileSessionStore::at_default_path(), config.initial_tab);
    root.activate();
    root
}

/// Session plus a client that sends its access token.
fn signed_in(config: &Config) -> Result<(Session, ApiClient)> {
    let root = navigation_root(config);
    let Some(session) = root.session().cloned() else {
        bail!("Not logged in (run `nmapp login --user <name>` first)");
    };
    let client = ApiClient::from_config(config)?.with_access_token(&session.access_token);
    Ok((session, client))
}
