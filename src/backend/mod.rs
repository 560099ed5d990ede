//! Providers built from the `[[backend]]` sections of the config

pub mod directory;

use anyhow::{Context, Result};
use reconcile::{BoxedProvider, HandlerProvider};

use crate::config::Config;
use crate::document::Document;
use directory::DirectoryHandler;

/// One provider per configured backend, with a handler per declared type
///
/// Handlers keep the declared type order, so containers listed first are
/// created first and deleted last.
pub fn build_providers(config: &Config) -> Result<Vec<BoxedProvider<Document>>> {
    let mut providers: Vec<BoxedProvider<Document>> = Vec::with_capacity(config.backends.len());

    for backend in &config.backends {
        let root = config.backend_root(backend);
        let mut provider = HandlerProvider::new(backend.name.clone());

        for type_name in &backend.types {
            provider
                .register(
                    type_name.clone(),
                    Box::new(DirectoryHandler::new(root.join(type_name))),
                )
                .with_context(|| format!("Invalid backend '{}'", backend.name))?;
        }

        log::debug!(
            "Backend {} at {} handles {}",
            backend.name,
            root.display(),
            backend.types.join(", ")
        );
        providers.push(Box::new(provider));
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Provider;

    #[test]
    fn test_providers_follow_config() {
        let config = Config::parse(
            r#"
[[backend]]
name = "grafana"
path = "/srv/grafana"
types = ["Folder", "Alert"]

[[backend]]
name = "pager"
path = "/srv/pager"
types = ["Route"]
"#,
        )
        .unwrap();

        let providers = build_providers(&config).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name(), "grafana");
        assert_eq!(providers[0].operating_types(), vec!["Folder", "Alert"]);
        assert_eq!(providers[1].operating_types(), vec!["Route"]);
    }

    #[test]
    fn test_repeated_type_in_backend_fails() {
        let config = Config::parse(
            r#"
[[backend]]
name = "grafana"
path = "/srv/grafana"
types = ["Folder", "Folder"]
"#,
        )
        .unwrap();

        assert!(build_providers(&config).is_err());
    }
}
