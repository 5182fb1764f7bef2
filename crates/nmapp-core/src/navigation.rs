//! Root view selection.
//!
//! The root owns the session state. It starts `Unknown` and renders nothing
//! until the session store has been read; from then on it is either logged
//! in or logged out and never goes back to `Unknown`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, Registration, UserProfile};
use crate::auth::AuthGateway;
use crate::error::ClientResult;
use crate::session::{Session, SessionStore};

/// Tabs of the authenticated view set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Dashboard,
    History,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::History, Tab::Profile];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::History => "history",
            Tab::Profile => "profile",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Tab::Dashboard),
            "history" => Ok(Tab::History),
            "profile" => Ok(Tab::Profile),
            other => Err(format!(
                "Unknown tab '{other}' (expected dashboard, history or profile)"
            )),
        }
    }
}

/// Screens reachable outside the tab bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    MachineDetail,
    DownloadReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Session store not read yet
    Unknown,
    LoggedOut,
    LoggedIn(Session),
}

/// What the root shows for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewTree {
    Unauthenticated {
        screens: [Screen; 2],
        initial: Screen,
    },
    Authenticated {
        user: UserProfile,
        tabs: [Tab; 3],
        initial_tab: Tab,
        stack: [Screen; 2],
    },
}

pub struct NavigationRoot<S> {
    store: S,
    state: AuthState,
    initial_tab: Tab,
}

impl<S: SessionStore> NavigationRoot<S> {
    pub fn new(store: S, initial_tab: Tab) -> Self {
        Self {
            store,
            state: AuthState::Unknown,
            initial_tab,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::LoggedIn(session) => Some(session),
            AuthState::Unknown | AuthState::LoggedOut => None,
        }
    }

    /// Reads the session store and leaves `Unknown`. Later calls keep the
    /// current state.
    pub fn activate(&mut self) -> &AuthState {
        if self.state == AuthState::Unknown {
            self.state = match self.store.load() {
                Some(session) => {
                    tracing::info!(user_id = session.user.id, "session restored");
                    AuthState::LoggedIn(session)
                }
                None => {
                    tracing::info!("no stored session");
                    AuthState::LoggedOut
                }
            };
        }
        &self.state
    }

    /// View set for the current state; `None` while still `Unknown`.
    pub fn render(&self) -> Option<ViewTree> {
        match &self.state {
            AuthState::Unknown => None,
            AuthState::LoggedOut => Some(ViewTree::Unauthenticated {
                screens: [Screen::Login, Screen::Register],
                initial: Screen::Login,
            }),
            AuthState::LoggedIn(session) => Some(ViewTree::Authenticated {
                user: session.user.clone(),
                tabs: Tab::ALL,
                initial_tab: self.initial_tab,
                stack: [Screen::MachineDetail, Screen::DownloadReport],
            }),
        }
    }

    /// Switches to the authenticated view set for a session that is already
    /// persisted.
    pub fn on_login(&mut self, session: Session) {
        tracing::info!(user_id = session.user.id, "logged in");
        self.state = AuthState::LoggedIn(session);
    }

    /// Logs in through the gateway and switches views on success.
    ///
    /// # Errors
    /// Returns the gateway error; the state is unchanged.
    pub async fn login(
        &mut self,
        client: &ApiClient,
        identifier: &str,
        secret: &str,
    ) -> ClientResult<Session> {
        let session = AuthGateway::new(client, &self.store)
            .login(identifier, secret)
            .await?;
        self.on_login(session.clone());
        Ok(session)
    }

    /// Registers through the gateway and switches views on success.
    ///
    /// # Errors
    /// Returns the gateway error; the state is unchanged.
    pub async fn register(
        &mut self,
        client: &ApiClient,
        registration: &Registration,
    ) -> ClientResult<Session> {
        let session = AuthGateway::new(client, &self.store)
            .register(registration)
            .await?;
        self.on_login(session.clone());
        Ok(session)
    }

    /// Clears every stored session field and shows the logged-out views.
    ///
    /// # Errors
    /// Returns a storage error if the store cannot be cleared; the state is
    /// unchanged so the user still sees they are logged in.
    pub fn logout(&mut self) -> ClientResult<()> {
        self.store.clear()?;
        if self.state != AuthState::LoggedOut {
            tracing::info!("logged out");
        }
        self.state = AuthState::LoggedOut;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::MemorySessionStore;

    fn session() -> Session {
        Session {
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
            user: UserProfile {
                id: 1,
                username: "jdoe".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
            },
        }
    }

    #[test]
    fn test_renders_nothing_until_activated() {
        let root = NavigationRoot::new(MemorySessionStore::new(), Tab::Dashboard);
        assert_eq!(root.state(), &AuthState::Unknown);
        assert_eq!(root.render(), None);
    }

    #[test]
    fn test_activation_without_session_shows_login() {
        let mut root = NavigationRoot::new(MemorySessionStore::new(), Tab::Dashboard);
        assert_eq!(root.activate(), &AuthState::LoggedOut);
        assert_eq!(
            root.render(),
            Some(ViewTree::Unauthenticated {
                screens: [Screen::Login, Screen::Register],
                initial: Screen::Login,
            })
        );
    }

    #[test]
    fn test_activation_with_session_shows_tabs() {
        let store = MemorySessionStore::with_session(session());
        let mut root = NavigationRoot::new(store, Tab::History);
        root.activate();

        let Some(ViewTree::Authenticated {
            user, initial_tab, ..
        }) = root.render()
        else {
            panic!("expected authenticated views");
        };
        assert_eq!(user.username, "jdoe");
        assert_eq!(initial_tab, Tab::History);
    }

    #[test]
    fn test_logout_clears_store_and_never_returns_to_unknown() {
        let store = MemorySessionStore::with_session(session());
        let mut root = NavigationRoot::new(store, Tab::Dashboard);
        root.activate();

        root.logout().unwrap();
        assert_eq!(root.state(), &AuthState::LoggedOut);
        assert_eq!(root.store().load(), None);

        root.activate();
        assert_eq!(root.state(), &AuthState::LoggedOut);

        root.on_login(session());
        assert!(root.session().is_some());
    }

    #[tokio::test]
    async fn test_login_switches_to_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "a1",
                "refresh": "r1",
                "user": {"id": 1, "username": "jdoe"}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let mut root = NavigationRoot::new(MemorySessionStore::new(), Tab::Dashboard);
        root.activate();

        let session = root.login(&client, "jdoe", "pw").await.unwrap();
        assert_eq!(session.access_token, "a1");
        assert!(matches!(root.render(), Some(ViewTree::Authenticated { .. })));
        assert!(root.store().load().is_some());
    }

    #[tokio::test]
    async fn test_failed_login_stays_logged_out() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let mut root = NavigationRoot::new(MemorySessionStore::new(), Tab::Dashboard);
        root.activate();

        assert!(root.login(&client, "", "").await.is_err());
        assert_eq!(root.state(), &AuthState::LoggedOut);
    }

    #[test]
    fn test_tab_parsing() {
        assert_eq!("History".parse::<Tab>().unwrap(), Tab::History);
        assert!("settings".parse::<Tab>().is_err());
        assert_eq!(Tab::default(), Tab::Dashboard);
        assert_eq!(Tab::Profile.to_string(), "profile");
    }
}
