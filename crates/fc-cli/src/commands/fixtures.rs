//! `fc fixtures`.

use serde::Serialize;
use tabled::Tabled;

use fc_core::HarnessConfig;

use crate::cli::OutputFormat;
use crate::output::{info, output};
use crate::CliResult;

use super::load_fixtures;

/// Subject representation for display. Passwords are never shown.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SubjectDisplay {
    /// Run-order position.
    #[tabled(rename = "#")]
    pub position: usize,
    /// Subject identifier.
    #[tabled(rename = "Subject")]
    pub subject_id: String,
    /// Login name.
    #[tabled(rename = "Username")]
    pub username: String,
}

/// Client representation for display. Secrets are never shown.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ClientDisplay {
    /// Client identifier.
    #[tabled(rename = "Client ID")]
    pub client_id: String,
    /// Display name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Whether a secret is registered.
    #[tabled(rename = "Confidential")]
    pub confidential: bool,
    /// Redirect URI templates.
    #[tabled(rename = "Redirect URIs")]
    pub redirect_uris: String,
    /// Allowed scopes.
    #[tabled(rename = "Scopes")]
    pub allowed_scopes: String,
}

/// Lists fixtures as the run would see them.
pub fn run_fixtures(config: &HarnessConfig, format: OutputFormat) -> CliResult<()> {
    let registry = load_fixtures(config)?;

    let subjects: Vec<SubjectDisplay> = registry
        .subjects()
        .iter()
        .enumerate()
        .map(|(i, s)| SubjectDisplay {
            position: i + 1,
            subject_id: s.subject_id.clone(),
            username: s.credential.username.clone(),
        })
        .collect();
    let clients: Vec<ClientDisplay> = registry
        .clients()
        .iter()
        .map(|c| ClientDisplay {
            client_id: c.client_id.clone(),
            name: c.display_name().to_string(),
            confidential: c.client_secret.is_some(),
            redirect_uris: c.redirect_uris.join(" "),
            allowed_scopes: c.allowed_scopes.join(" "),
        })
        .collect();

    if format == OutputFormat::Json {
        let document = serde_json::json!({ "subjects": subjects, "clients": clients });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if format == OutputFormat::Table {
        info(&format!("Subjects ({})", subjects.len()));
    }
    output(&subjects, format)?;
    if format == OutputFormat::Table {
        info(&format!("Clients ({})", clients.len()));
    }
    output(&clients, format)?;

    if format == OutputFormat::Table && registry.client(&config.client.client_id).is_err() {
        crate::output::warning(&format!(
            "Configured client {} is not in the fixtures",
            config.client.client_id
        ));
    }
    Ok(())
}
