use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use insightify_console::api::{AnalyticsApi, ProgressFn};
use insightify_console::domain::{DataKind, Domain, DEFAULT_PRIORITY};
use insightify_console::error::ConsoleError;
use insightify_console::payload::{
    AdsKpis, AuthSession, BankingKpis, Cluster, DatasetSummary, DomainKpis, Impact, Insight,
    PreviewRecord, Segmentation, StatsSummary, VideoKpis,
};
use insightify_console::session::DashboardSession;
use insightify_console::view::assemble;

fn kpis_for(domain: Domain) -> DomainKpis {
    match domain {
        Domain::Video => DomainKpis::Video(VideoKpis {
            total_views: 120_000,
            avg_engagement_rate: 0.043,
            top_category: "Music".to_string(),
        }),
        Domain::Advertising => DomainKpis::Ads(AdsKpis {
            total_impressions: 5_000_000,
            avg_ctr: 0.021,
            avg_conversion_rate: 0.085,
            total_cost: 15_400.0,
        }),
        Domain::Banking => DomainKpis::Banking(BankingKpis {
            avg_balance: 1_500.0,
            churn_rate: 0.1234,
            avg_products: 2.3,
        }),
    }
}

fn preview_for(domain: Domain) -> Vec<PreviewRecord> {
    let row = match domain {
        Domain::Video => serde_json::json!({"video_id": "v1", "views": 100, "likes": 9}),
        Domain::Advertising => serde_json::json!({"campaign_id": "c1", "cost": 12.5, "conversions": 4}),
        Domain::Banking => serde_json::json!({"customer_id": "u1", "account_balance": 900.0}),
    };
    vec![row.as_object().unwrap().clone()]
}

/// Mock backend with configurable per-(domain, kind) failures and counters
/// proving when the cross-cutting fetches were issued.
#[derive(Default)]
struct MockApi {
    fail_kpis: HashSet<Domain>,
    fail_preview: HashSet<Domain>,
    kpis_settled: AtomicUsize,
    segmentation_calls: Mutex<Vec<(Domain, u32, usize)>>,
    insight_calls: Mutex<Vec<(Domain, usize)>>,
}

impl MockApi {
    fn failing_kpis(domains: impl IntoIterator<Item = Domain>) -> Self {
        Self {
            fail_kpis: domains.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AnalyticsApi for MockApi {
    async fn fetch_kpis(&self, domain: Domain) -> Result<DomainKpis, ConsoleError> {
        // Stagger the settle order so the no-partial-selection check is not
        // trivially satisfied by instant completion.
        let delay = match domain {
            Domain::Video => 30,
            Domain::Advertising => 5,
            Domain::Banking => 15,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let result = if self.fail_kpis.contains(&domain) {
            Err(ConsoleError::DataUnavailable {
                domain,
                kind: DataKind::Kpis,
            })
        } else {
            Ok(kpis_for(domain))
        };
        self.kpis_settled.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn fetch_preview(&self, domain: Domain) -> Result<Vec<PreviewRecord>, ConsoleError> {
        if self.fail_preview.contains(&domain) {
            return Err(ConsoleError::DataUnavailable {
                domain,
                kind: DataKind::Preview,
            });
        }
        Ok(preview_for(domain))
    }

    async fn fetch_stats(&self, domain: Domain) -> Result<StatsSummary, ConsoleError> {
        Err(ConsoleError::DataUnavailable {
            domain,
            kind: DataKind::Stats,
        })
    }

    async fn fetch_segmentation(
        &self,
        domain: Domain,
        n_clusters: u32,
    ) -> Result<Segmentation, ConsoleError> {
        let settled = self.kpis_settled.load(Ordering::SeqCst);
        self.segmentation_calls
            .lock()
            .unwrap()
            .push((domain, n_clusters, settled));
        Ok(Segmentation {
            clusters: vec![
                Cluster {
                    cluster_id: 0,
                    size: 40,
                    features: BTreeMap::new(),
                    points: None,
                },
                Cluster {
                    cluster_id: 1,
                    size: 12,
                    features: BTreeMap::new(),
                    points: None,
                },
            ],
        })
    }

    async fn fetch_insights(&self, domain: Domain) -> Result<Vec<Insight>, ConsoleError> {
        let settled = self.kpis_settled.load(Ordering::SeqCst);
        self.insight_calls.lock().unwrap().push((domain, settled));
        Ok(vec![Insight {
            category: "Retention".to_string(),
            insight: "Customers with fewer products show higher churn.".to_string(),
            impact: Impact::High,
        }])
    }

    async fn upload_dataset(
        &self,
        domain: Domain,
        _file: &Path,
        _progress: ProgressFn,
    ) -> Result<DatasetSummary, ConsoleError> {
        Err(ConsoleError::UploadFailed {
            domain,
            message: "not under test".to_string(),
        })
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<AuthSession, ConsoleError> {
        Err(ConsoleError::AuthFailed("not under test".to_string()))
    }
}

fn session(api: MockApi) -> DashboardSession<MockApi> {
    DashboardSession::new(api, 3, DEFAULT_PRIORITY.to_vec())
}

#[tokio::test]
async fn failing_domain_does_not_take_down_the_others() {
    let session = session(MockApi::failing_kpis([Domain::Advertising]));
    let data = session.load().await;

    assert!(data.snapshots.get(Domain::Video).available);
    assert!(!data.snapshots.get(Domain::Advertising).available);
    assert!(data.snapshots.get(Domain::Banking).available);
    assert!(data.snapshots.get(Domain::Video).preview.is_some());

    let view = assemble(&data, "$");
    assert_eq!(view.sections.len(), 2);
    assert!(!view.empty);
}

#[tokio::test]
async fn selection_waits_for_every_kpi_fetch() {
    let session = session(MockApi::default());
    let data = session.load().await;

    assert_eq!(data.selected, Some(Domain::Banking));
    let calls = session.api().segmentation_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (domain, n_clusters, settled_before_call) = calls[0];
    assert_eq!(domain, Domain::Banking);
    assert_eq!(n_clusters, 3);
    assert_eq!(settled_before_call, 3, "segmentation fired before all KPI fetches settled");

    let insight_calls = session.api().insight_calls.lock().unwrap().clone();
    assert_eq!(insight_calls, vec![(Domain::Banking, 3)]);

    let view = assemble(&data, "$");
    assert_eq!(view.selected, Some(Domain::Banking));
    assert_eq!(view.segmentation.as_ref().unwrap().clusters.len(), 2);
    assert_eq!(view.insights.len(), 1);
}

#[tokio::test]
async fn banking_down_falls_through_to_advertising() {
    let session = session(MockApi::failing_kpis([Domain::Banking]));
    let data = session.load().await;
    assert_eq!(data.selected, Some(Domain::Advertising));
}

#[tokio::test]
async fn only_video_left_selects_video() {
    let session = session(MockApi::failing_kpis([Domain::Banking, Domain::Advertising]));
    let data = session.load().await;
    assert_eq!(data.selected, Some(Domain::Video));
    assert!(data.segmentation.is_some());
}

#[tokio::test]
async fn no_data_anywhere_issues_no_cross_cutting_fetches() {
    let session = session(MockApi::failing_kpis(Domain::ALL));
    let data = session.load().await;

    assert_eq!(data.selected, None);
    assert!(data.segmentation.is_none());
    assert!(data.insights.is_none());
    assert!(session.api().segmentation_calls.lock().unwrap().is_empty());
    assert!(session.api().insight_calls.lock().unwrap().is_empty());

    let view = assemble(&data, "$");
    assert!(view.empty);
    assert!(view.sections.is_empty());
}

#[tokio::test]
async fn failed_preview_keeps_section_but_omits_chart() {
    let api = MockApi {
        fail_preview: [Domain::Video].into_iter().collect(),
        ..MockApi::default()
    };
    let session = session(api);
    let data = session.load().await;

    let snapshot = data.snapshots.get(Domain::Video);
    assert!(snapshot.available);
    assert!(snapshot.preview.is_none());

    let view = assemble(&data, "$");
    let video = view
        .sections
        .iter()
        .find(|section| section.domain == Domain::Video)
        .unwrap();
    assert!(video.series.is_none());
    assert!(!video.kpis.is_empty());
}

#[tokio::test]
async fn probe_selection_matches_full_load() {
    let probe = session(MockApi::failing_kpis([Domain::Banking])).probe_selection().await;
    assert_eq!(probe, Some(Domain::Advertising));

    let probe = session(MockApi::failing_kpis(Domain::ALL)).probe_selection().await;
    assert_eq!(probe, None);
}
