//! Grant verifier.

use std::time::Duration;

use url::Url;

use fc_browser::{BrowserSession, Navigation};
use fc_core::{ClientRegistration, FlowError, FlowResult, InteractionProfile, TestSubject};

use crate::driver::bounded;

/// Checks the grant-management page for a grant to the client.
#[derive(Debug, Clone)]
pub struct GrantVerifier<'a> {
    endpoint: &'a Url,
    profile: &'a InteractionProfile,
    step_timeout: Duration,
}

impl<'a> GrantVerifier<'a> {
    /// Creates a verifier for the grants page at `endpoint`.
    #[must_use]
    pub const fn new(endpoint: &'a Url, profile: &'a InteractionProfile, step_timeout: Duration) -> Self {
        Self {
            endpoint,
            profile,
            step_timeout,
        }
    }

    /// Verifies that `subject` has a grant listed for `client`.
    ///
    /// Must be called with the session that performed the authorization so
    /// the provider recognises the signed-in subject.
    pub async fn verify(
        &self,
        session: &mut dyn BrowserSession,
        subject: &TestSubject,
        client: &ClientRegistration,
    ) -> FlowResult<()> {
        let not_found = || FlowError::GrantNotFound {
            subject_id: subject.subject_id.clone(),
            client_id: client.client_id.clone(),
        };

        let navigation = bounded("grants", self.step_timeout, session.navigate(self.endpoint))
            .await
            .map_err(|e| match e {
                FlowError::InteractionTimeout { .. } => e,
                other => {
                    tracing::debug!(error = %other, "Grants page unavailable");
                    not_found()
                }
            })?;

        let Navigation::Page(page) = navigation else {
            tracing::debug!("Grants navigation ended at the redirect uri");
            return Err(not_found());
        };

        if !(200..300).contains(&page.status()) {
            tracing::debug!(page = %page.describe(), "Grants page returned an error");
            return Err(not_found());
        }
        if page.form_with_field(&self.profile.password_field).is_some() {
            tracing::debug!(page = %page.describe(), "Bounced to login from grants page");
            return Err(not_found());
        }

        let text = page.text();
        if text.contains(client.display_name()) || text.contains(&client.client_id) {
            Ok(())
        } else {
            tracing::debug!(client = %client.client_id, "Client not listed on grants page");
            Err(not_found())
        }
    }
}
