//! Refresh command handler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use pvreg_core::{ClientOutcome, EntityKind, RefreshOutcome, RegistryHost};

use crate::cli::{GlobalOpts, RefreshArgs, RegistryName};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summary ─────────────────────────────────────────────────────────

/// Serializable view of one registry's refresh.
#[derive(Debug, Serialize)]
pub struct CycleSummary {
    pub registry: EntityKind,
    pub completed: bool,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub store_failures: usize,
    pub failed_clients: Vec<FailedClient>,
    pub disabled_clients: Vec<i32>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct FailedClient {
    pub client_id: i32,
    pub error: String,
}

impl CycleSummary {
    pub fn new(registry: EntityKind, outcome: &RefreshOutcome) -> Self {
        let Some(report) = outcome.report() else {
            return Self {
                registry,
                completed: false,
                inserted: 0,
                updated: 0,
                removed: 0,
                store_failures: 0,
                failed_clients: Vec::new(),
                disabled_clients: Vec::new(),
                finished_at: None,
            };
        };

        let failed_clients = report
            .clients
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                ClientOutcome::Failed(err) => Some(FailedClient {
                    client_id: id.get(),
                    error: err.to_string(),
                }),
                ClientOutcome::Ok | ClientOutcome::Disabled => None,
            })
            .collect();

        Self {
            registry,
            completed: true,
            inserted: report.inserted,
            updated: report.updated,
            removed: report.removed,
            store_failures: report.store_failures,
            failed_clients,
            disabled_clients: report.disabled_clients().into_iter().map(|c| c.get()).collect(),
            finished_at: Some(report.finished_at),
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CycleRow {
    #[tabled(rename = "Registry")]
    registry: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Inserted")]
    inserted: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Removed")]
    removed: usize,
    #[tabled(rename = "Store failures")]
    store_failures: usize,
    #[tabled(rename = "Failed clients")]
    failed: String,
    #[tabled(rename = "Disabled clients")]
    disabled: String,
}

impl From<&CycleSummary> for CycleRow {
    fn from(s: &CycleSummary) -> Self {
        Self {
            registry: s.registry.to_string(),
            status: if s.completed { "completed" } else { "already running" }.into(),
            inserted: s.inserted,
            updated: s.updated,
            removed: s.removed,
            store_failures: s.store_failures,
            failed: util::join_or_dash(
                &s.failed_clients
                    .iter()
                    .map(|f| f.client_id.to_string())
                    .collect::<Vec<_>>(),
            ),
            disabled: util::join_or_dash(
                &s.disabled_clients
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            ),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    host: &RegistryHost,
    args: RefreshArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut summaries = Vec::new();

    // Providers first: media items may reference them.
    if args.only != Some(RegistryName::Media) {
        let outcome = host.providers().load().await;
        summaries.push(CycleSummary::new(EntityKind::Provider, &outcome));
    }
    if args.only != Some(RegistryName::Providers) {
        let outcome = host.media().load().await;
        summaries.push(CycleSummary::new(EntityKind::Media, &outcome));
    }

    if !global.quiet {
        for failed in summaries.iter().flat_map(|s| &s.failed_clients) {
            eprintln!("warning: client {} skipped: {}", failed.client_id, failed.error);
        }
    }

    let out = output::render_list(
        &global.format(),
        &summaries,
        |s| CycleRow::from(s),
        |s| s.registry.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
