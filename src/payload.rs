use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Domain;
use crate::error::ConsoleError;

/// Per-domain KPI payloads. The backend returns a bare JSON object whose
/// field set depends on the dataset type, so the variant is chosen by the
/// caller (which knows which domain it asked for), not by a wire tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainKpis {
    Video(VideoKpis),
    Ads(AdsKpis),
    Banking(BankingKpis),
}

impl DomainKpis {
    pub fn from_value(domain: Domain, value: Value) -> Result<Self, ConsoleError> {
        let parsed = match domain {
            Domain::Video => serde_json::from_value(value).map(DomainKpis::Video),
            Domain::Advertising => serde_json::from_value(value).map(DomainKpis::Ads),
            Domain::Banking => serde_json::from_value(value).map(DomainKpis::Banking),
        };
        parsed.map_err(|err| ConsoleError::InvalidPayload(format!("{domain} kpis: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoKpis {
    pub total_views: u64,
    pub avg_engagement_rate: f64,
    pub top_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsKpis {
    pub total_impressions: u64,
    pub avg_ctr: f64,
    pub avg_conversion_rate: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankingKpis {
    pub avg_balance: f64,
    pub churn_rate: f64,
    pub avg_products: f64,
}

/// One row of the chart preview. Field names are domain-specific; the view
/// assembler knows which ones to pull.
pub type PreviewRecord = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segmentation {
    pub clusters: Vec<Cluster>,
}

impl Segmentation {
    /// Cluster identifiers must be unique within one result.
    pub fn validate(self) -> Result<Self, ConsoleError> {
        let mut seen = HashSet::new();
        for cluster in &self.clusters {
            if !seen.insert(cluster.cluster_id) {
                return Err(ConsoleError::InvalidPayload(format!(
                    "duplicate cluster_id {} in segmentation result",
                    cluster.cluster_id
                )));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: u32,
    pub size: u64,
    pub features: BTreeMap<String, f64>,
    /// 2-D projection coordinates for scatter display, when the backend
    /// provides them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// A generated observation. Position in the returned list is its ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub category: String,
    pub insight: String,
    pub impact: Impact,
}

/// Ingestion summary returned by the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub filename: String,
    pub rows: u64,
    pub columns: Vec<String>,
    #[serde(default)]
    pub missing_values: BTreeMap<String, u64>,
}

/// Per-column `describe()` summary statistics.
pub type StatsSummary = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: String,
}
