//! Login and registration against the backend.
//!
//! The gateway validates input before any request, interprets the shared
//! `{access, refresh, user}` / `{error}` response shape, and persists the
//! resulting session. Nothing is retried.

use crate::api::{ApiClient, AuthResponse, LoginRequest, RawResponse, Registration};
use crate::error::{ClientError, ClientResult};
use crate::session::{Session, SessionStore};

const MISSING_CREDENTIALS: &str = "Please enter both email/username and password";
const INVALID_RESPONSE: &str = "Invalid response from server";
const LOGIN_FALLBACK: &str = "Invalid credentials";
const REGISTER_FALLBACK: &str = "Registration failed";

pub struct AuthGateway<'a> {
    client: &'a ApiClient,
    store: &'a dyn SessionStore,
}

impl<'a> AuthGateway<'a> {
    pub fn new(client: &'a ApiClient, store: &'a dyn SessionStore) -> Self {
        Self { client, store }
    }

    /// Exchanges credentials for a session and persists it.
    ///
    /// # Errors
    /// - `Validation` when either input is blank (no request is sent)
    /// - `Network` on transport failure
    /// - `Protocol` when the body is not the expected JSON
    /// - `Auth` when the server rejects the credentials
    /// - `Storage` when the session cannot be persisted
    pub async fn login(&self, identifier: &str, secret: &str) -> ClientResult<Session> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.trim().is_empty() {
            return Err(ClientError::validation(MISSING_CREDENTIALS));
        }

        tracing::debug!(identifier, "login attempt");
        let request = LoginRequest {
            email_or_username: identifier,
            password: secret,
        };
        let raw = self.client.login(&request).await?;
        let session = interpret(&raw, LOGIN_FALLBACK)?;
        self.store.save(&session)?;
        tracing::info!(user_id = session.user.id, "logged in");
        Ok(session)
    }

    /// Creates an account; on success the new user is logged in.
    ///
    /// # Errors
    /// Same kinds as [`AuthGateway::login`].
    pub async fn register(&self, registration: &Registration) -> ClientResult<Session> {
        validate_registration(registration)?;

        tracing::debug!(username = %registration.username, "register attempt");
        let raw = self.client.register(registration).await?;
        let session = interpret(&raw, REGISTER_FALLBACK)?;
        self.store.save(&session)?;
        tracing::info!(user_id = session.user.id, "registered");
        Ok(session)
    }
}

fn validate_registration(registration: &Registration) -> ClientResult<()> {
    let fields = [
        ("first name", &registration.first_name),
        ("last name", &registration.last_name),
        ("username", &registration.username),
        ("email", &registration.email),
        ("password", &registration.password),
        ("password confirmation", &registration.confirm_password),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ClientError::validation(format!("Please enter your {name}")));
    }
    if registration.password != registration.confirm_password {
        return Err(ClientError::validation("Passwords do not match"));
    }
    Ok(())
}

/// Turns a raw auth response into a session.
///
/// Success needs a 2xx status and a `user` object; anything else is a
/// rejection carrying the server's `error` string or `fallback`.
fn interpret(raw: &RawResponse, fallback: &str) -> ClientResult<Session> {
    let body: AuthResponse = serde_json::from_str(&raw.body).map_err(|err| {
        ClientError::protocol(INVALID_RESPONSE).with_details(err.to_string())
    })?;

    match body {
        AuthResponse {
            user: Some(user),
            access,
            refresh,
            ..
        } if raw.is_success() => {
            let (Some(access_token), Some(refresh_token)) = (access, refresh) else {
                return Err(ClientError::protocol(INVALID_RESPONSE)
                    .with_details("missing access or refresh token"));
            };
            Ok(Session {
                access_token,
                refresh_token,
                user,
            })
        }
        AuthResponse { error, .. } => {
            let message = error
                .filter(|msg| !msg.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            tracing::debug!(status = raw.status, "auth rejected");
            Err(ClientError::auth(message).with_details(format!("HTTP {}", raw.status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ClientErrorKind;
    use crate::session::MemorySessionStore;

    fn user_json() -> serde_json::Value {
        json!({
            "id": 1,
            "username": "jdoe",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@example.com"
        })
    }

    fn registration() -> Registration {
        Registration {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            username: "jdoe".to_string(),
            email: "jane@example.com".to_string(),
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .and(body_json(json!({"email_or_username": "jdoe", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": "a1",
                "refresh": "r1",
                "user": user_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let session = AuthGateway::new(&client, &store)
            .login("  jdoe ", "pw")
            .await
            .unwrap();

        assert_eq!(session.access_token, "a1");
        assert_eq!(session.refresh_token, "r1");
        assert_eq!(session.user.username, "jdoe");
        assert_eq!(store.load(), Some(session));
    }

    #[tokio::test]
    async fn test_login_rejected_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "bad credentials"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Auth);
        assert_eq!(err.message, "bad credentials");
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_login_rejected_without_message_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_ok_status_without_user_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a1"})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "pw")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Auth);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_success_missing_tokens_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json()})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "pw")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Protocol);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "pw")
            .await
            .unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Protocol);
        assert_eq!(err.message, "Invalid response from server");
    }

    #[tokio::test]
    async fn test_blank_input_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let gateway = AuthGateway::new(&client, &store);

        let err = gateway.login("", "pw").await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Validation);
        let err = gateway.login("jdoe", "   ").await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_login_unreachable_is_network_error() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .login("jdoe", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Network);
    }

    #[tokio::test]
    async fn test_register_success_logs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "access": "a2",
                "refresh": "r2",
                "user": user_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let session = AuthGateway::new(&client, &store)
            .register(&registration())
            .await
            .unwrap();

        assert_eq!(session.access_token, "a2");
        assert_eq!(store.load().map(|s| s.user.id), Some(1));
    }

    #[tokio::test]
    async fn test_register_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "Username already exists"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let err = AuthGateway::new(&client, &store)
            .register(&registration())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ClientErrorKind::Auth);
        assert_eq!(err.message, "Username already exists");
    }

    #[tokio::test]
    async fn test_register_validates_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let store = MemorySessionStore::new();
        let gateway = AuthGateway::new(&client, &store);

        let mut mismatch = registration();
        mismatch.confirm_password = "other".to_string();
        let err = gateway.register(&mismatch).await.unwrap_err();
        assert_eq!(err.message, "Passwords do not match");

        let mut blank = registration();
        blank.email = " ".to_string();
        let err = gateway.register(&blank).await.unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Validation);
        assert_eq!(err.message, "Please enter your email");
    }
}
