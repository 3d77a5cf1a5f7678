use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;
use crate::session::Snapshots;

/// The closed set of dataset domains the console understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Video,
    Advertising,
    Banking,
}

impl Domain {
    /// All domains, in dashboard display order.
    pub const ALL: [Domain; 3] = [Domain::Video, Domain::Advertising, Domain::Banking];

    /// Path segment the backend uses for this domain.
    pub fn api_slug(self) -> &'static str {
        match self {
            Domain::Video => "youtube",
            Domain::Advertising => "ads",
            Domain::Banking => "banking",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Domain::Video => "Video Analytics",
            Domain::Advertising => "Ads Performance",
            Domain::Banking => "Banking Analytics",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Video => write!(f, "video"),
            Domain::Advertising => write!(f, "advertising"),
            Domain::Banking => write!(f, "banking"),
        }
    }
}

impl FromStr for Domain {
    type Err = ConsoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "video" | "youtube" => Ok(Domain::Video),
            "advertising" | "ads" => Ok(Domain::Advertising),
            "banking" => Ok(Domain::Banking),
            _ => Err(ConsoleError::InvalidDomain(value.to_string())),
        }
    }
}

/// What kind of data a single fetch was after. Only used for reporting which
/// section of the dashboard went dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Kpis,
    Preview,
    Stats,
    Segmentation,
    Insights,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Kpis => write!(f, "kpis"),
            DataKind::Preview => write!(f, "preview"),
            DataKind::Stats => write!(f, "stats"),
            DataKind::Segmentation => write!(f, "segmentation"),
            DataKind::Insights => write!(f, "insights"),
        }
    }
}

/// Cross-cutting views (segmentation, insights) are driven by exactly one
/// domain per load. Banking is considered the most business-critical, then
/// advertising, then video. The order is a policy, not an inherent
/// constraint; config may override it.
pub const DEFAULT_PRIORITY: [Domain; 3] = [Domain::Banking, Domain::Advertising, Domain::Video];

/// Picks the domain that drives segmentation and insights: the first entry in
/// `priority` whose snapshot reports available data. `None` when no domain
/// has data, in which case no cross-cutting fetch should be issued at all.
pub fn select_domain(snapshots: &Snapshots, priority: &[Domain]) -> Option<Domain> {
    priority
        .iter()
        .copied()
        .find(|domain| snapshots.get(*domain).available)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_domain_accepts_api_slugs() {
        assert_eq!("youtube".parse::<Domain>().unwrap(), Domain::Video);
        assert_eq!("ads".parse::<Domain>().unwrap(), Domain::Advertising);
        assert_eq!("Banking".parse::<Domain>().unwrap(), Domain::Banking);
    }

    #[test]
    fn parse_domain_invalid() {
        let err = "crypto".parse::<Domain>().unwrap_err();
        assert_matches!(err, ConsoleError::InvalidDomain(_));
    }

    #[test]
    fn slug_round_trip() {
        for domain in Domain::ALL {
            assert_eq!(domain.api_slug().parse::<Domain>().unwrap(), domain);
        }
    }
}
