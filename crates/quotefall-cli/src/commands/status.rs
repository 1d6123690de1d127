use serde::Serialize;

use quotefall_core::{ProviderId, QuoteResolver};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct StatusResponseData {
    configured_providers: Vec<ProviderId>,
    online: bool,
    cache_entries: usize,
}

pub async fn run(resolver: &QuoteResolver) -> Result<CommandResult, CliError> {
    let configured_providers = resolver.configured_providers();
    let online = resolver.is_online().await;
    let cache_entries = resolver.cache().len().await;

    let data = serde_json::to_value(StatusResponseData {
        configured_providers: configured_providers.clone(),
        online,
        cache_entries,
    })?;

    let mut result = CommandResult::ok(data, configured_providers);
    if !online {
        result = result.with_warning("network unreachable, resolution will use offline data");
    }

    Ok(result)
}
