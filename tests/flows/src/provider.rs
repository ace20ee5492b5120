//! In-process authorization server.
//!
//! Implements just enough of an OpenID provider for the authorization code
//! flow to run through a real browser session:
//!
//! - `/connect/authorize` starts a request and bounces to login or consent
//! - `/account/login` and `/consent` render and accept HTML forms
//! - `/connect/token` redeems single-use codes
//! - `/connect/userinfo` and `/connect/introspect` answer for issued tokens
//! - `/grants` lists the clients the signed-in subject consented to

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Form, Query, State};
use axum::http::header::{AUTHORIZATION, COOKIE, LOCATION, SET_COOKIE, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;
use uuid::Uuid;

use fc_core::{ClientRegistration, TestSubject};

const SESSION_COOKIE: &str = "fc.session";

/// What the provider knows about.
#[derive(Debug, Clone)]
pub struct ProviderFixtures {
    /// Accounts that can sign in.
    pub subjects: Vec<TestSubject>,
    /// Registered clients.
    pub clients: Vec<ClientRegistration>,
    /// Host substituted into redirect URI templates when validating requests.
    pub redirect_host: String,
    /// API resources allowed to introspect, with their secrets.
    ///
    /// A token's audience lists each resource whose name prefixes one of the
    /// granted scopes.
    pub resources: HashMap<String, String>,
    /// Whether the grants page lists consented clients.
    pub list_grants: bool,
}

impl ProviderFixtures {
    /// Fixtures for the given accounts and clients with a single `some-app` resource.
    #[must_use]
    pub fn new(subjects: Vec<TestSubject>, clients: Vec<ClientRegistration>) -> Self {
        Self {
            subjects,
            clients,
            redirect_host: "www".to_string(),
            resources: HashMap::from([("some-app".to_string(), "some-app-secret".to_string())]),
            list_grants: true,
        }
    }
}

struct PendingRequest {
    client_id: String,
    redirect_uri: String,
    scope: String,
    state: Option<String>,
}

struct IssuedCode {
    client_id: String,
    redirect_uri: String,
    subject_id: String,
    scope: String,
}

struct IssuedToken {
    client_id: String,
    subject_id: String,
    scope: String,
}

#[derive(Default)]
struct Ledger {
    requests: HashMap<String, PendingRequest>,
    sessions: HashMap<String, String>,
    codes: HashMap<String, IssuedCode>,
    tokens: HashMap<String, IssuedToken>,
    grants: HashMap<String, BTreeSet<String>>,
    issued_codes: Vec<String>,
    authorize_calls: usize,
}

struct ProviderState {
    base_url: String,
    fixtures: ProviderFixtures,
    ledger: Mutex<Ledger>,
}

impl ProviderState {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn client(&self, client_id: &str) -> Option<&ClientRegistration> {
        self.fixtures.clients.iter().find(|c| c.client_id == client_id)
    }

    fn signed_in(&self, headers: &HeaderMap) -> Option<String> {
        let session = session_cookie(headers)?;
        self.ledger().sessions.get(&session).cloned()
    }

    fn audiences(&self, scope: &str) -> Vec<String> {
        let mut audiences: Vec<String> = self
            .fixtures
            .resources
            .keys()
            .filter(|name| scope.split_whitespace().any(|s| s.starts_with(name.as_str())))
            .cloned()
            .collect();
        audiences.sort();
        audiences
    }
}

type Shared = Arc<ProviderState>;

/// A running mock provider. Shuts down when dropped.
pub struct MockProvider {
    base_url: String,
    state: Shared,
    _shutdown_tx: oneshot::Sender<()>,
}

impl MockProvider {
    /// Starts the provider on a random local port.
    pub async fn start(fixtures: ProviderFixtures) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let state = Arc::new(ProviderState {
            base_url: base_url.clone(),
            fixtures,
            ledger: Mutex::new(Ledger::default()),
        });

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(discovery))
            .route("/connect/authorize", get(authorize))
            .route("/account/login", get(login_page).post(login))
            .route("/consent", get(consent_page).post(consent))
            .route("/connect/token", axum::routing::post(token))
            .route("/connect/userinfo", get(userinfo))
            .route("/connect/introspect", axum::routing::post(introspect))
            .route("/grants", get(grants))
            .with_state(state.clone());

        let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                tracing::error!("Mock provider error: {}", e);
            }
        });

        Ok(Self {
            base_url,
            state,
            _shutdown_tx,
        })
    }

    /// Base URL, usable as the authority.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every authorization code issued so far, in issue order.
    #[must_use]
    pub fn issued_codes(&self) -> Vec<String> {
        self.state.ledger().issued_codes.clone()
    }

    /// Number of requests that reached the authorization endpoint.
    #[must_use]
    pub fn authorize_calls(&self) -> usize {
        self.state.ledger().authorize_calls
    }

    /// Clients the subject has granted access to.
    #[must_use]
    pub fn grants_of(&self, subject_id: &str) -> Vec<String> {
        self.state
            .ledger()
            .grants
            .get(subject_id)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }
}

async fn discovery(State(state): State<Shared>) -> Json<serde_json::Value> {
    let base = &state.base_url;
    Json(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/connect/authorize"),
        "token_endpoint": format!("{base}/connect/token"),
        "userinfo_endpoint": format!("{base}/connect/userinfo"),
        "introspection_endpoint": format!("{base}/connect/introspect"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "scopes_supported": ["openid", "profile"],
    }))
}

async fn authorize(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.ledger().authorize_calls += 1;

    let param = |name: &str| query.get(name).cloned().unwrap_or_default();
    let client_id = param("client_id");
    let redirect_uri = param("redirect_uri");

    let Some(client) = state.client(&client_id) else {
        return error_page(StatusCode::BAD_REQUEST, "unknown client");
    };
    if !client.matches_redirect_uri(&redirect_uri, &state.fixtures.redirect_host) {
        return error_page(StatusCode::BAD_REQUEST, "invalid redirect_uri");
    }
    let request_state = query.get("state").cloned();
    if param("response_type") != "code" {
        return redirect_with(
            &redirect_uri,
            &[("error", "unsupported_response_type")],
            request_state.as_deref(),
        );
    }

    let request_id = Uuid::new_v4().simple().to_string();
    state.ledger().requests.insert(
        request_id.clone(),
        PendingRequest {
            client_id,
            redirect_uri,
            scope: param("scope"),
            state: request_state,
        },
    );

    if state.signed_in(&headers).is_some() {
        found(&format!("/consent?request={request_id}"))
    } else {
        found(&format!("/account/login?request={request_id}"))
    }
}

async fn login_page(Query(query): Query<HashMap<String, String>>) -> Response {
    let request = query.get("request").map_or("", String::as_str);
    Html(render_login(request, None)).into_response()
}

async fn login(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let field = |name: &str| form.get(name).map_or("", String::as_str);
    let request = field("request");

    let subject = state.fixtures.subjects.iter().find(|s| {
        s.credential.username == field("username") && s.credential.password == field("password")
    });
    let Some(subject) = subject else {
        return Html(render_login(request, Some("Invalid username or password"))).into_response();
    };

    let session = Uuid::new_v4().simple().to_string();
    state
        .ledger()
        .sessions
        .insert(session.clone(), subject.subject_id.clone());

    let target = if request.is_empty() {
        "/grants".to_string()
    } else {
        format!("/consent?request={request}")
    };
    let mut response = found(&target);
    if let Ok(cookie) = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly").parse() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

async fn consent_page(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let request_id = query.get("request").cloned().unwrap_or_default();
    if state.signed_in(&headers).is_none() {
        return found(&format!("/account/login?request={request_id}"));
    }

    let ledger = state.ledger();
    let Some(request) = ledger.requests.get(&request_id) else {
        return error_page(StatusCode::BAD_REQUEST, "unknown authorization request");
    };
    let client_name = escape(
        state
            .client(&request.client_id)
            .map_or(request.client_id.as_str(), ClientRegistration::display_name),
    );

    let scopes: String = request
        .scope
        .split_whitespace()
        .map(|scope| {
            let checked = if scope == "openid" { " checked" } else { "" };
            format!(
                r#"<label><input type="checkbox" name="ScopesConsented" value="{scope}"{checked} /> {scope}</label>"#
            )
        })
        .collect();

    Html(format!(
        r#"<html><head><title>Consent</title></head><body>
        <h1>{client_name} is requesting your permission</h1>
        <form method="post" action="/consent">
            <input type="hidden" name="request" value="{request_id}" />
            {scopes}
            <input type="checkbox" name="RememberConsent" value="true" />
            <button name="consent" value="yes">Yes, Allow</button>
            <button name="consent" value="no">No, Do Not Allow</button>
        </form></body></html>"#
    ))
    .into_response()
}

async fn consent(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    let value = |name: &str| {
        form.iter()
            .find(|(n, _)| n == name)
            .map_or("", |(_, v)| v.as_str())
    };
    let Some(subject_id) = state.signed_in(&headers) else {
        return error_page(StatusCode::UNAUTHORIZED, "not signed in");
    };

    let mut ledger = state.ledger();
    let Some(request) = ledger.requests.remove(value("request")) else {
        return error_page(StatusCode::BAD_REQUEST, "unknown authorization request");
    };

    if value("consent") != "yes" {
        return redirect_with(
            &request.redirect_uri,
            &[("error", "access_denied")],
            request.state.as_deref(),
        );
    }

    let granted: Vec<&str> = form
        .iter()
        .filter(|(n, _)| n == "ScopesConsented")
        .map(|(_, v)| v.as_str())
        .collect();

    let code = Uuid::new_v4().simple().to_string();
    ledger.codes.insert(
        code.clone(),
        IssuedCode {
            client_id: request.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            subject_id: subject_id.clone(),
            scope: granted.join(" "),
        },
    );
    ledger.issued_codes.push(code.clone());
    ledger
        .grants
        .entry(subject_id)
        .or_default()
        .insert(request.client_id.clone());

    redirect_with(&request.redirect_uri, &[("code", &code)], request.state.as_deref())
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let field = |name: &str| form.get(name).map_or("", String::as_str);

    if field("grant_type") != "authorization_code" {
        return oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type", None);
    }
    let Some(client) = state.client(field("client_id")) else {
        return oauth_error(StatusCode::UNAUTHORIZED, "invalid_client", None);
    };
    if let Some(secret) = &client.client_secret
        && field("client_secret") != secret
    {
        return oauth_error(StatusCode::UNAUTHORIZED, "invalid_client", None);
    }

    let mut ledger = state.ledger();
    let Some(issued) = ledger.codes.remove(field("code")) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_grant",
            Some("authorization code is invalid or was already used"),
        );
    };
    if issued.client_id != client.client_id {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", Some("client mismatch"));
    }
    if issued.redirect_uri != field("redirect_uri") {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_grant",
            Some("redirect_uri does not match the authorization request"),
        );
    }

    let access_token = Uuid::new_v4().simple().to_string();
    let scope = issued.scope.clone();
    ledger.tokens.insert(
        access_token.clone(),
        IssuedToken {
            client_id: issued.client_id,
            subject_id: issued.subject_id,
            scope: issued.scope,
        },
    );

    Json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": scope,
    }))
    .into_response()
}

async fn userinfo(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let ledger = state.ledger();
    let Some(issued) = token.and_then(|t| ledger.tokens.get(t)) else {
        return (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, r#"Bearer error="invalid_token""#)],
        )
            .into_response();
    };

    let username = state
        .fixtures
        .subjects
        .iter()
        .find(|s| s.subject_id == issued.subject_id)
        .map(|s| s.credential.username.clone());
    Json(json!({
        "sub": issued.subject_id,
        "preferred_username": username,
    }))
    .into_response()
}

async fn introspect(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if let Some(credentials) = basic_credentials(&headers) {
        let (name, secret) = credentials;
        if state.fixtures.resources.get(&name) != Some(&secret) {
            return oauth_error(StatusCode::UNAUTHORIZED, "invalid_client", None);
        }
    }

    let ledger = state.ledger();
    let Some(issued) = form.get("token").and_then(|t| ledger.tokens.get(t)) else {
        return Json(json!({ "active": false })).into_response();
    };

    let mut document = json!({
        "active": true,
        "client_id": issued.client_id,
        "sub": issued.subject_id,
        "scope": issued.scope,
        "iss": state.base_url,
        "token_type": "access_token",
    });
    let audiences = state.audiences(&issued.scope);
    if !audiences.is_empty() {
        document["aud"] = json!(audiences);
    }
    Json(document).into_response()
}

async fn grants(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let Some(subject_id) = state.signed_in(&headers) else {
        return Html(render_login("", None)).into_response();
    };

    let clients: Vec<String> = if state.fixtures.list_grants {
        state
            .ledger()
            .grants
            .get(&subject_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.client(id))
            .map(|c| format!("<li><strong>{}</strong></li>", escape(c.display_name())))
            .collect()
    } else {
        Vec::new()
    };

    let body = if clients.is_empty() {
        "<p>You have not given access to any applications</p>".to_string()
    } else {
        format!("<ul>{}</ul>", clients.concat())
    };
    Html(format!(
        "<html><head><title>Grants</title></head><body>\
         <h1>Client Application Permissions</h1>{body}</body></html>"
    ))
    .into_response()
}

fn render_login(request: &str, error: Option<&str>) -> String {
    let error = error.map_or_else(String::new, |e| format!(r#"<div class="error">{e}</div>"#));
    format!(
        r#"<html><head><title>Login</title></head><body>
        {error}
        <form method="post" action="/account/login">
            <input type="hidden" name="request" value="{request}" />
            <input type="text" name="username" />
            <input type="password" name="password" />
            <button name="button" value="login">Login</button>
        </form></body></html>"#
    )
}

fn error_page(status: StatusCode, message: &str) -> Response {
    (
        status,
        Html(format!(
            "<html><head><title>Error</title></head><body><p>{}</p></body></html>",
            escape(message)
        )),
    )
        .into_response()
}

fn oauth_error(status: StatusCode, error: &str, description: Option<&str>) -> Response {
    (
        status,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn redirect_with(redirect_uri: &str, params: &[(&str, &str)], state: Option<&str>) -> Response {
    let Ok(mut url) = Url::parse(redirect_uri) else {
        return error_page(StatusCode::BAD_REQUEST, "invalid redirect_uri");
    };
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params {
            query.append_pair(name, value);
        }
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    found(url.as_str())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| pair.trim().strip_prefix(&format!("{SESSION_COOKIE}=")).map(str::to_string))
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (name, secret) = decoded.split_once(':')?;
    Some((name.to_string(), secret.to_string()))
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
