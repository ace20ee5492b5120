//! `fc discover`.

use serde::Serialize;
use tabled::Tabled;

use fc_core::HarnessConfig;
use fc_harness::resolve_endpoints;

use crate::cli::OutputFormat;
use crate::output::{info, output};
use crate::CliResult;

use super::http_client;

/// Endpoint representation for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct EndpointDisplay {
    /// Endpoint role.
    #[tabled(rename = "Endpoint")]
    pub name: &'static str,
    /// Resolved URL.
    #[tabled(rename = "URL")]
    pub url: String,
}

/// Prints the endpoints a run would use.
pub async fn run_discover(config: &HarnessConfig, format: OutputFormat) -> CliResult<()> {
    let endpoints = resolve_endpoints(config, &http_client(config)?).await?;

    if format == OutputFormat::Table {
        let source = if config.provider.discovery {
            "discovery"
        } else {
            "conventional paths"
        };
        info(&format!("Endpoints for {} ({source})", config.provider.authority));
    }
    let rows = [
        ("authorization", &endpoints.authorization),
        ("token", &endpoints.token),
        ("userinfo", &endpoints.userinfo),
        ("introspection", &endpoints.introspection),
        ("grants", &endpoints.grants),
    ]
    .into_iter()
    .map(|(name, url)| EndpointDisplay {
        name,
        url: url.to_string(),
    })
    .collect::<Vec<_>>();
    output(&rows, format)
}
