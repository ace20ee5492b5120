//! Authorization-request driver.
//!
//! Sends a session to the authorization endpoint and plays the subject's part
//! of the login and consent pages until the provider redirects to the
//! client's redirect URI. The redirect is intercepted, never fetched.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use url::Url;

use fc_browser::{BrowserError, BrowserSession, Navigation, Page, RedirectMatcher, html};
use fc_core::{FlowError, FlowResult, InteractionProfile, TestSubject};
use fc_protocol::{AuthorizationRequestParameters, AuthorizationResult};

/// A completed authorization pass.
#[derive(Clone)]
pub struct Authorization {
    /// Terminal redirect and its parameters.
    pub result: AuthorizationResult,
    /// The issued authorization code.
    pub code: String,
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// Drives one interactive authorization pass.
#[derive(Debug, Clone)]
pub struct AuthorizationDriver<'a> {
    endpoint: &'a Url,
    profile: &'a InteractionProfile,
    step_timeout: Duration,
}

impl<'a> AuthorizationDriver<'a> {
    /// Creates a driver for `endpoint`.
    #[must_use]
    pub const fn new(endpoint: &'a Url, profile: &'a InteractionProfile, step_timeout: Duration) -> Self {
        Self {
            endpoint,
            profile,
            step_timeout,
        }
    }

    /// Runs the pass and returns the validated code.
    ///
    /// The session is armed to stop at `matcher`. Credentials are submitted
    /// once; a login form shown again afterwards means they were rejected.
    pub async fn authorize(
        &self,
        session: &mut dyn BrowserSession,
        params: &AuthorizationRequestParameters,
        subject: &TestSubject,
        matcher: &RedirectMatcher,
    ) -> FlowResult<Authorization> {
        session.intercept(matcher.clone());
        let url = params.authorization_url(self.endpoint);
        tracing::debug!(
            client_id = params.client_id(),
            scope = params.scope(),
            response_type = params.response_type(),
            redirect_uri = params.redirect_uri(),
            "Starting authorization"
        );
        let mut navigation = bounded("navigation", self.step_timeout, session.navigate(&url)).await?;

        let mut credentials_sent = false;
        let mut submissions = 0;
        loop {
            let page = match navigation {
                Navigation::Intercepted(url) => {
                    let result = AuthorizationResult::from_url(url);
                    let code = result.clone().into_code(params)?;
                    return Ok(Authorization { result, code });
                }
                Navigation::Page(page) => page,
            };

            if !(200..400).contains(&page.status()) {
                return Err(FlowError::AuthorizationFailed(format!(
                    "provider answered with {}",
                    page.describe()
                )));
            }

            // Only submissions count; the final redirect needs no round of its own.
            if submissions >= self.profile.max_rounds {
                return Err(FlowError::AuthorizationFailed(format!(
                    "redirect uri not reached after {} interaction rounds",
                    self.profile.max_rounds
                )));
            }
            submissions += 1;

            if let Some(form) = page.form_with_field(&self.profile.password_field) {
                if credentials_sent {
                    return Err(FlowError::AuthorizationFailed(format!(
                        "login rejected for subject {}",
                        subject.subject_id
                    )));
                }
                let mut values = form.values();
                html::set_value(&mut values, &self.profile.username_field, &subject.credential.username);
                html::set_value(&mut values, &self.profile.password_field, &subject.credential.password);
                for (name, value) in &self.profile.login_fields {
                    html::set_value(&mut values, name, value);
                }
                credentials_sent = true;
                tracing::debug!(page = %page_path(&page), "Submitting login form");
                navigation = bounded("login", self.step_timeout, session.submit(&form, &values)).await?;
                continue;
            }

            if let Some(form) = page
                .forms()
                .into_iter()
                .find(|f| f.has_submit(&self.profile.consent_button))
            {
                let mut values = form.values_all_checked();
                values.push((
                    self.profile.consent_button.clone(),
                    self.profile.consent_value.clone(),
                ));
                tracing::debug!(page = %page_path(&page), "Granting consent");
                navigation = bounded("consent", self.step_timeout, session.submit(&form, &values)).await?;
                continue;
            }

            return Err(FlowError::AuthorizationFailed(format!(
                "no login or consent form on {}",
                page.describe()
            )));
        }
    }
}

fn page_path(page: &Page) -> &str {
    page.url().path()
}

/// Bounds one interactive browser step.
///
/// Exceeding `timeout`, or a request timeout inside the browser, is an
/// `InteractionTimeout`. Other browser errors fail the authorization.
pub async fn bounded<T>(
    step: &str,
    timeout: Duration,
    future: impl Future<Output = Result<T, BrowserError>>,
) -> FlowResult<T> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.is_timeout() => Err(FlowError::InteractionTimeout {
            step: step.to_string(),
            timeout,
        }),
        Ok(Err(e)) => Err(FlowError::AuthorizationFailed(format!("{step} failed: {e}"))),
        Err(_) => Err(FlowError::InteractionTimeout {
            step: step.to_string(),
            timeout,
        }),
    }
}
