use futures_util::future::{join, join_all};
use tracing::{debug, info};

use crate::api::AnalyticsApi;
use crate::domain::{select_domain, Domain};
use crate::error::ConsoleError;
use crate::payload::{DomainKpis, Insight, PreviewRecord, Segmentation};

/// Everything fetched for one domain during one load. Created empty,
/// populated as the domain's fetches settle, never persisted.
#[derive(Debug, Clone, Default)]
pub struct DomainSnapshot {
    pub kpis: Option<DomainKpis>,
    pub preview: Option<Vec<PreviewRecord>>,
    /// Whether the KPI fetch for this domain succeeded. Drives both section
    /// rendering and cross-cutting domain selection.
    pub available: bool,
}

/// Total map Domain -> DomainSnapshot for one load.
#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    slots: [DomainSnapshot; 3],
}

impl Snapshots {
    fn index(domain: Domain) -> usize {
        match domain {
            Domain::Video => 0,
            Domain::Advertising => 1,
            Domain::Banking => 2,
        }
    }

    pub fn get(&self, domain: Domain) -> &DomainSnapshot {
        &self.slots[Self::index(domain)]
    }

    pub fn set(&mut self, domain: Domain, snapshot: DomainSnapshot) {
        self.slots[Self::index(domain)] = snapshot;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Domain, &DomainSnapshot)> {
        Domain::ALL.iter().map(|domain| (*domain, self.get(*domain)))
    }
}

/// Result of one full dashboard load.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub snapshots: Snapshots,
    /// The single domain driving segmentation/insights, if any domain had
    /// data at all.
    pub selected: Option<Domain>,
    pub segmentation: Option<Segmentation>,
    pub insights: Option<Vec<Insight>>,
}

/// Per-"page load" context: owns the client and the selection policy for the
/// duration of one console view. Dropping the session (or the future returned
/// by [`load`](Self::load)) abandons all in-flight fetches; nothing is
/// written after abandonment because results are only assembled once the
/// joins complete.
pub struct DashboardSession<A: AnalyticsApi> {
    api: A,
    n_clusters: u32,
    priority: Vec<Domain>,
}

impl<A: AnalyticsApi> DashboardSession<A> {
    pub fn new(api: A, n_clusters: u32, priority: Vec<Domain>) -> Self {
        Self {
            api,
            n_clusters,
            priority,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// One dashboard load: KPI and preview fetches for every domain run as
    /// independent futures, each failure caught in its own unit — one
    /// domain going dark never takes another down with it. Selection runs
    /// only after every KPI fetch has settled, and only then are the
    /// segmentation/insight fetches for the selected domain issued.
    pub async fn load(&self) -> DashboardData {
        let per_domain = Domain::ALL.map(|domain| self.load_domain(domain));
        let settled = join_all(per_domain).await;

        let mut snapshots = Snapshots::default();
        for (domain, snapshot) in Domain::ALL.iter().zip(settled) {
            snapshots.set(*domain, snapshot);
        }

        let selected = select_domain(&snapshots, &self.priority);
        let (segmentation, insights) = match selected {
            Some(domain) => {
                info!(%domain, "selected domain for segmentation and insights");
                join(self.load_segmentation(domain), self.load_insights(domain)).await
            }
            None => {
                info!("no domain available, skipping segmentation and insights");
                (None, None)
            }
        };

        DashboardData {
            snapshots,
            selected,
            segmentation,
            insights,
        }
    }

    /// KPI-only availability probe: fetches every domain's KPIs in isolated
    /// units, waits for all of them to settle, and runs the selector. Used
    /// when only the cross-cutting views are wanted.
    pub async fn probe_selection(&self) -> Option<Domain> {
        let probes = Domain::ALL.map(|domain| async move {
            DomainSnapshot {
                available: self.api.fetch_kpis(domain).await.is_ok(),
                ..DomainSnapshot::default()
            }
        });
        let settled = join_all(probes).await;

        let mut snapshots = Snapshots::default();
        for (domain, snapshot) in Domain::ALL.iter().zip(settled) {
            snapshots.set(*domain, snapshot);
        }
        select_domain(&snapshots, &self.priority)
    }

    pub async fn segmentation(&self, domain: Domain) -> Result<Segmentation, ConsoleError> {
        self.api.fetch_segmentation(domain, self.n_clusters).await
    }

    pub async fn insights(&self, domain: Domain) -> Result<Vec<Insight>, ConsoleError> {
        self.api.fetch_insights(domain).await
    }

    async fn load_domain(&self, domain: Domain) -> DomainSnapshot {
        let (kpis, preview) = join(self.api.fetch_kpis(domain), self.api.fetch_preview(domain)).await;

        let kpis = match kpis {
            Ok(kpis) => Some(kpis),
            Err(err) => {
                debug!(%domain, %err, "kpis unavailable");
                None
            }
        };
        let preview = match preview {
            Ok(records) => Some(records),
            Err(err) => {
                debug!(%domain, %err, "preview unavailable");
                None
            }
        };

        DomainSnapshot {
            available: kpis.is_some(),
            kpis,
            preview,
        }
    }

    async fn load_segmentation(&self, domain: Domain) -> Option<Segmentation> {
        match self.api.fetch_segmentation(domain, self.n_clusters).await {
            Ok(segmentation) => Some(segmentation),
            Err(err) => {
                debug!(%domain, %err, "segmentation unavailable");
                None
            }
        }
    }

    async fn load_insights(&self, domain: Domain) -> Option<Vec<Insight>> {
        match self.api.fetch_insights(domain).await {
            Ok(insights) => Some(insights),
            Err(err) => {
                debug!(%domain, %err, "insights unavailable");
                None
            }
        }
    }
}
