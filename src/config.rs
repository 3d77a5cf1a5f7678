use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, DEFAULT_PRIORITY};
use crate::error::ConsoleError;

pub const DEFAULT_N_CLUSTERS: u32 = 3;

/// Raw shape of `insightify.json`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub n_clusters: Option<u32>,
    /// Order in which domains are considered for segmentation/insight
    /// selection. Defaults to banking, advertising, video.
    #[serde(default)]
    pub priority: Option<Vec<Domain>>,
    #[serde(default)]
    pub currency_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub n_clusters: u32,
    pub priority: Vec<Domain>,
    pub currency_prefix: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ConsoleError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("insightify.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ConsoleError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConsoleError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ConsoleError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ConsoleError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConsoleError::ConfigParse("base_url must not be empty".to_string()));
        }

        let priority = match config.priority {
            Some(order) => {
                let mut seen = std::collections::HashSet::new();
                for domain in &order {
                    if !seen.insert(*domain) {
                        return Err(ConsoleError::ConfigParse(format!(
                            "duplicate domain {domain} in priority"
                        )));
                    }
                }
                if order.is_empty() {
                    return Err(ConsoleError::ConfigParse("priority must not be empty".to_string()));
                }
                order
            }
            None => DEFAULT_PRIORITY.to_vec(),
        };

        let n_clusters = config.n_clusters.unwrap_or(DEFAULT_N_CLUSTERS);
        if n_clusters == 0 {
            return Err(ConsoleError::ConfigParse("n_clusters must be at least 1".to_string()));
        }

        Ok(ResolvedConfig {
            base_url,
            access_token: config.access_token,
            n_clusters,
            priority,
            currency_prefix: config.currency_prefix.unwrap_or_else(|| "$".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults() {
        let config = Config {
            base_url: "http://127.0.0.1:8000/".to_string(),
            access_token: None,
            n_clusters: None,
            priority: None,
            currency_prefix: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.base_url, "http://127.0.0.1:8000");
        assert_eq!(resolved.n_clusters, DEFAULT_N_CLUSTERS);
        assert_eq!(resolved.priority, DEFAULT_PRIORITY.to_vec());
        assert_eq!(resolved.currency_prefix, "$");
    }

    #[test]
    fn resolve_rejects_duplicate_priority() {
        let config = Config {
            base_url: "http://localhost".to_string(),
            access_token: None,
            n_clusters: None,
            priority: Some(vec![Domain::Banking, Domain::Banking]),
            currency_prefix: None,
        };

        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert!(matches!(err, ConsoleError::ConfigParse(_)));
    }
}
