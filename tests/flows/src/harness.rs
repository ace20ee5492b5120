//! Test harness wiring the orchestrator to a [`MockProvider`].

use std::sync::Once;

use fc_browser::{Browser, BrowserOptions, HttpBrowser};
use fc_core::{
    ClientRegistration, Credential, FixtureRegistry, HarnessConfig, RunReport, SetupError,
    SetupResult, TestSubject,
};
use fc_harness::{Orchestrator, resolve_endpoints};

use crate::provider::{MockProvider, ProviderFixtures};

static TRACING: Once = Once::new();

/// Routes harness logs to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Builds a subject with the password `<username>-password`.
#[must_use]
pub fn subject(subject_id: &str, username: &str) -> TestSubject {
    TestSubject {
        subject_id: subject_id.to_string(),
        credential: Credential {
            username: username.to_string(),
            password: format!("{username}-password"),
        },
    }
}

/// The public client used by most flows.
#[must_use]
pub fn client_a() -> ClientRegistration {
    ClientRegistration {
        client_id: "client-A".to_string(),
        client_name: Some("Client A Web".to_string()),
        client_secret: None,
        redirect_uris: vec!["https://*.example.com/cb".to_string()],
        allowed_scopes: vec![
            "openid".to_string(),
            "profile".to_string(),
            "some-app-scope-1".to_string(),
        ],
    }
}

/// A provider plus the configuration and fixtures the harness runs with.
pub struct TestHarness {
    /// Running provider.
    pub provider: MockProvider,
    /// Harness configuration, pointing at the provider.
    pub config: HarnessConfig,
    /// Fixtures the harness iterates.
    pub registry: FixtureRegistry,
}

impl TestHarness {
    /// Starts a provider that knows exactly the harness's subjects and clients.
    pub async fn new(subjects: Vec<TestSubject>, clients: Vec<ClientRegistration>) -> anyhow::Result<Self> {
        let fixtures = ProviderFixtures::new(subjects.clone(), clients.clone());
        Self::with_provider(fixtures, subjects, clients).await
    }

    /// Starts a provider from `fixtures`; the harness uses its own fixture lists.
    pub async fn with_provider(
        fixtures: ProviderFixtures,
        subjects: Vec<TestSubject>,
        clients: Vec<ClientRegistration>,
    ) -> anyhow::Result<Self> {
        init_tracing();
        let provider = MockProvider::start(fixtures).await?;

        let mut config = HarnessConfig::for_testing(provider.base_url());
        config.client.client_id = "client-A".to_string();
        config.client.scope = "openid profile".to_string();
        config.client.introspection_audience = "some-app".to_string();
        config.client.introspection_secret = Some("some-app-secret".to_string());

        let registry = FixtureRegistry::new(subjects, clients)?;
        Ok(Self {
            provider,
            config,
            registry,
        })
    }

    /// Launches a browser configured like the CLI does.
    pub fn browser(&self) -> SetupResult<HttpBrowser> {
        HttpBrowser::launch(BrowserOptions {
            timeout: self.config.timeouts.interaction(),
            ..BrowserOptions::default()
        })
        .map_err(|e| SetupError::Browser(e.to_string()))
    }

    /// Runs the matrix with `browser`.
    pub async fn run_with(&self, browser: &HttpBrowser) -> SetupResult<RunReport> {
        let http = fc_protocol::client::build_http(self.config.timeouts.http(), false)
            .map_err(|e| SetupError::Config(e.to_string()))?;
        let endpoints = resolve_endpoints(&self.config, &http).await?;
        Orchestrator::new(&self.config, &self.registry, browser, endpoints)?
            .run()
            .await
    }

    /// Runs the matrix with a fresh browser, closing it afterwards.
    pub async fn run(&self) -> SetupResult<RunReport> {
        let browser = self.browser()?;
        let report = self.run_with(&browser).await;
        browser.close().await;
        report
    }
}
