//! Test matrix orchestrator.
//!
//! Runs every subject against the selected client. Each pair walks a fixed
//! sequence of states; a failure ends the pair and the remaining steps are
//! reported as not run. Pairs never affect each other.

use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tracing::Instrument;
use uuid::Uuid;

use fc_browser::{Browser, BrowserSession};
use fc_core::{
    Endpoints, FixtureRegistry, FlowError, FlowResult, HarnessConfig, PairReport,
    PairReportBuilder, RunReport, SetupError, SetupResult, Step, TestSubject,
};
use fc_protocol::client::build_http;
use fc_protocol::{AuthorizationRequestParameters, ProtocolClient, TokenSet};

use crate::driver::AuthorizationDriver;
use crate::grants::GrantVerifier;
use crate::setup::RunPlan;

/// Progress of one pair. Each state holds what its step consumes.
#[derive(Debug)]
pub enum PairState {
    /// Waiting for the interactive authorization pass.
    Authorizing,
    /// Holding a code to exchange.
    Exchanging {
        /// Authorization code from the redirect.
        code: String,
    },
    /// Holding tokens to present at the user-info endpoint.
    VerifyingUserInfo {
        /// Issued tokens.
        tokens: TokenSet,
    },
    /// Holding tokens to introspect.
    VerifyingIntrospection {
        /// Issued tokens.
        tokens: TokenSet,
    },
    /// Checking the grant with the authorization session.
    VerifyingGrants,
    /// Every step passed.
    Done,
}

impl PairState {
    /// Step executed from this state, `None` once done.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::Authorizing => Some(Step::Authorize),
            Self::Exchanging { .. } => Some(Step::ExchangeToken),
            Self::VerifyingUserInfo { .. } => Some(Step::UserInfo),
            Self::VerifyingIntrospection { .. } => Some(Step::Introspection),
            Self::VerifyingGrants => Some(Step::Grants),
            Self::Done => None,
        }
    }
}

/// Runs the (subject, client) matrix.
pub struct Orchestrator<'a> {
    config: &'a HarnessConfig,
    registry: &'a FixtureRegistry,
    browser: &'a dyn Browser,
    endpoints: Endpoints,
    protocol: ProtocolClient,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator over an already launched browser.
    pub fn new(
        config: &'a HarnessConfig,
        registry: &'a FixtureRegistry,
        browser: &'a dyn Browser,
        endpoints: Endpoints,
    ) -> SetupResult<Self> {
        let http = build_http(config.timeouts.http(), config.provider.accept_invalid_certs)
            .map_err(|e| SetupError::Config(format!("http client: {e}")))?;
        let protocol = ProtocolClient::with_http(http, endpoints.clone());
        Ok(Self {
            config,
            registry,
            browser,
            endpoints,
            protocol,
        })
    }

    /// Runs every pair and returns the report.
    ///
    /// Fails only when the run cannot be set up; pair failures are recorded
    /// in the report. Pairs are listed in ascending subject order whatever
    /// the configured concurrency.
    pub async fn run(&self) -> SetupResult<RunReport> {
        let plan = RunPlan::prepare(self.config, self.registry)?;
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let concurrency = self.config.concurrency.0.max(1);

        tracing::info!(
            %run_id,
            client = %plan.client.client_id,
            subjects = self.registry.subjects().len(),
            concurrency,
            "Starting run"
        );

        let pairs: Vec<PairReport> = stream::iter(self.registry.subjects())
            .map(|subject| self.run_pair(&plan, subject))
            .buffered(concurrency)
            .collect()
            .await;

        let report = RunReport {
            run_id,
            client_id: plan.client.client_id.clone(),
            started_at,
            finished_at: Utc::now(),
            pairs,
        };
        tracing::info!(
            %run_id,
            passed = report.pairs.iter().filter(|p| p.passed()).count(),
            failed = report.failed_pairs().count(),
            "Run finished"
        );
        Ok(report)
    }

    async fn run_pair(&self, plan: &RunPlan, subject: &TestSubject) -> PairReport {
        let span = tracing::info_span!(
            "pair",
            subject = %subject.subject_id,
            client = %plan.client.client_id,
            session = tracing::field::Empty
        );
        async move {
            let mut report = PairReport::builder(&subject.subject_id, &plan.client.client_id);

            let mut session = match self.browser.new_session().await {
                Ok(session) => session,
                Err(e) => {
                    let error = FlowError::AuthorizationFailed(format!("no browser session: {e}"));
                    tracing::warn!(step = Step::Authorize.label(), error = %error, "Step failed");
                    report.failed(Step::Authorize, &error, std::time::Duration::ZERO);
                    return report.build();
                }
            };
            tracing::Span::current().record("session", session.id());

            let params = AuthorizationRequestParameters::with_correlation(
                &plan.client.client_id,
                &self.config.client.scope,
                &plan.redirect_uri,
                self.config.client.state.as_deref(),
                self.config.client.nonce.as_deref(),
            );

            let mut state = PairState::Authorizing;
            while let Some(step) = state.step() {
                let started = Instant::now();
                match self
                    .advance(state, plan, subject, &params, session.as_mut(), &mut report)
                    .await
                {
                    Ok(next) => {
                        report.passed(step, started.elapsed());
                        tracing::info!(step = step.label(), "Step passed");
                        state = next;
                    }
                    Err(error) => {
                        report.failed(step, &error, started.elapsed());
                        tracing::warn!(
                            step = step.label(),
                            kind = %error.kind(),
                            error = %error,
                            "Step failed"
                        );
                        break;
                    }
                }
            }

            session.close().await;
            report.build()
        }
        .instrument(span)
        .await
    }

    async fn advance(
        &self,
        state: PairState,
        plan: &RunPlan,
        subject: &TestSubject,
        params: &AuthorizationRequestParameters,
        session: &mut dyn BrowserSession,
        report: &mut PairReportBuilder,
    ) -> FlowResult<PairState> {
        let step_timeout = self.config.timeouts.interaction();
        match state {
            PairState::Authorizing => {
                let authorization =
                    AuthorizationDriver::new(&self.endpoints.authorization, &self.config.interaction, step_timeout)
                        .authorize(session, params, subject, &plan.matcher)
                        .await?;
                report.code(&authorization.code);
                Ok(PairState::Exchanging {
                    code: authorization.code,
                })
            }
            PairState::Exchanging { code } => {
                let request = params.token_request(code, plan.client.client_secret.clone());
                let tokens = self.protocol.exchange_code(&request).await?;
                Ok(PairState::VerifyingUserInfo { tokens })
            }
            PairState::VerifyingUserInfo { tokens } => {
                let expected = self
                    .config
                    .client
                    .match_userinfo_subject
                    .then_some(subject.subject_id.as_str());
                self.protocol.userinfo(&tokens, expected).await?;
                Ok(PairState::VerifyingIntrospection { tokens })
            }
            PairState::VerifyingIntrospection { tokens } => {
                self.protocol
                    .introspect(
                        &tokens,
                        &self.config.client.introspection_audience,
                        self.config.client.introspection_secret.as_deref(),
                    )
                    .await?;
                Ok(PairState::VerifyingGrants)
            }
            PairState::VerifyingGrants => {
                GrantVerifier::new(&self.endpoints.grants, &self.config.interaction, step_timeout)
                    .verify(session, subject, &plan.client)
                    .await?;
                Ok(PairState::Done)
            }
            PairState::Done => Ok(PairState::Done),
        }
    }
}
