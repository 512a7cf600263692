use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::Result;
use crate::error::Error;

const FALLBACK_FILTER: &str = "info";

/// Initialise tracing avec un filtre optionnel et un mode JSON conditionnel.
///
/// Le filtre retenu est le premier valide parmi `explicit_filter`, `RUST_LOG`
/// et `info`.
///
/// # Errors
///
/// Retourne une erreur si la couche JSON est demandée alors que la
/// fonctionnalité n'est pas compilée, ou si un subscriber global est déjà
/// installé.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(explicit_filter, env_filter.as_deref())?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .flatten_event(true),
        );
        return tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()));
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

fn resolve_filter(explicit: Option<&str>, from_env: Option<&str>) -> Result<EnvFilter> {
    explicit
        .into_iter()
        .chain(from_env)
        .chain(std::iter::once(FALLBACK_FILTER))
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))
}
