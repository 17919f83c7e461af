use maxjungsi::catalog::InMemoryCatalog;
use maxjungsi::config::ScoringSettings;
use maxjungsi::error::AppError;
use maxjungsi::scoring::Gender;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the configured catalog snapshot, or starts empty when none is configured.
pub(crate) fn load_catalog(settings: &ScoringSettings) -> Result<InMemoryCatalog, AppError> {
    match &settings.catalog_path {
        Some(path) => Ok(InMemoryCatalog::from_json_file(path)?),
        None => {
            warn!("APP_CATALOG_PATH not set, serving with an empty scoring catalog");
            Ok(InMemoryCatalog::new())
        }
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn parse_gender(raw: &str) -> Result<Gender, String> {
    Gender::from_label(raw).ok_or_else(|| format!("'{raw}' is not a gender (use M or F)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gender_labels() {
        assert_eq!(parse_gender("M"), Ok(Gender::Male));
        assert_eq!(parse_gender("여"), Ok(Gender::Female));
        assert!(parse_gender("x").is_err());
    }

    #[test]
    fn empty_settings_yield_empty_catalog() {
        let catalog = load_catalog(&ScoringSettings::default()).expect("loads");
        use maxjungsi::catalog::ScoringCatalog;
        assert!(catalog.score_config(1, 2026).expect("lookup").is_none());
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let settings = ScoringSettings {
            catalog_path: Some("/nonexistent/catalog.json".into()),
            ..ScoringSettings::default()
        };
        assert!(matches!(load_catalog(&settings), Err(AppError::Catalog(_))));
    }
}
