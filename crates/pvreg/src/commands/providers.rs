//! Provider command handlers.

use std::str::FromStr;
use std::sync::Arc;

use tabled::Tabled;

use pvreg_core::{
    ClientId, Provider, ProviderFilter, ProviderType, RegistryEntity, RegistryHost,
};

use crate::cli::{GlobalOpts, ProviderListArgs, ProvidersArgs, ProvidersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Client")]
    client: i32,
    #[tabled(rename = "UID")]
    uid: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    provider_type: String,
    #[tabled(rename = "Countries")]
    countries: String,
    #[tabled(rename = "Languages")]
    languages: String,
}

impl From<&Arc<Provider>> for ProviderRow {
    fn from(p: &Arc<Provider>) -> Self {
        Self {
            id: surrogate(p),
            client: p.client_id().get(),
            uid: p.uid(),
            name: p.name.clone(),
            provider_type: p.provider_type.to_string(),
            countries: util::join_or_dash(&p.countries),
            languages: util::join_or_dash(&p.languages),
        }
    }
}

fn surrogate(p: &Provider) -> String {
    p.surrogate_id().map(|id| id.to_string()).unwrap_or_default()
}

fn detail(p: &Arc<Provider>) -> String {
    output::detail_block(&[
        ("ID", surrogate(p)),
        ("Key", p.key().to_string()),
        ("Name", p.name.clone()),
        ("Type", p.provider_type.to_string()),
        ("Default", p.is_client_provider().to_string()),
        ("Icon", p.icon_path.clone()),
        ("Thumb", p.thumb_path.clone()),
        ("Countries", util::join_or_dash(&p.countries)),
        ("Languages", util::join_or_dash(&p.languages)),
    ])
}

fn filters(args: &ProviderListArgs) -> Result<Vec<ProviderFilter>, CliError> {
    let mut filters = Vec::new();
    if let Some(client) = args.client {
        filters.push(ProviderFilter::ByClient(ClientId(client)));
    }
    if let Some(ref raw) = args.provider_type {
        let pt = ProviderType::from_str(raw).map_err(|_| CliError::Validation {
            field: "type".into(),
            reason: format!(
                "unknown provider type '{raw}' (expected addon, satellite, cable, aerial, iptv, other)"
            ),
        })?;
        filters.push(ProviderFilter::ByType(pt));
    }
    if args.defaults {
        filters.push(ProviderFilter::ClientProviders);
    }
    Ok(filters)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    host: &RegistryHost,
    args: ProvidersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let providers = host.providers();

    match args.command {
        ProvidersCommand::List(list) => {
            let filters = filters(&list)?;
            util::hydrate(providers.registry(), list.refresh).await;

            let snap: Vec<Arc<Provider>> = providers
                .list()
                .into_iter()
                .filter(|p| filters.iter().all(|f| f.matches(p)))
                .collect();
            let out = output::render_list(
                &global.format(),
                &snap,
                |p| ProviderRow::from(p),
                |p| p.key().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProvidersCommand::Get { provider } => {
            util::hydrate(providers.registry(), false).await;
            let found = util::resolve_provider(providers, &provider)?;
            let out = output::render_single(&global.format(), &found, detail, |p| {
                p.key().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProvidersCommand::Rename { provider, name } => {
            if name.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "must not be empty".into(),
                });
            }
            util::hydrate(providers.registry(), false).await;
            let found = util::resolve_provider(providers, &provider)?;

            let mut edited = Provider::clone(&found);
            edited.name = name;
            providers.persist_user_changes(&[edited]).await?;
            if !global.quiet {
                eprintln!("Provider {} renamed", found.key());
            }
            Ok(())
        }

        ProvidersCommand::Remove { provider } => {
            util::hydrate(providers.registry(), false).await;
            let found = util::resolve_provider(providers, &provider)?;
            providers.remove(&found.key()).await?;
            if !global.quiet {
                eprintln!("Provider {} removed", found.key());
            }
            Ok(())
        }
    }
}
