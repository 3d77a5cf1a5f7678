use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::{DataKind, Domain};
use crate::error::ConsoleError;
use crate::payload::{
    AuthSession, DatasetSummary, DomainKpis, Insight, PreviewRecord, Segmentation, StatsSummary,
};

/// Progress observer for an upload, called with a percentage in [0, 100].
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Everything the console asks of the analytics backend. One method per
/// endpoint; every call is an independent unit of failure.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn fetch_kpis(&self, domain: Domain) -> Result<DomainKpis, ConsoleError>;
    async fn fetch_preview(&self, domain: Domain) -> Result<Vec<PreviewRecord>, ConsoleError>;
    async fn fetch_stats(&self, domain: Domain) -> Result<StatsSummary, ConsoleError>;
    async fn fetch_segmentation(
        &self,
        domain: Domain,
        n_clusters: u32,
    ) -> Result<Segmentation, ConsoleError>;
    async fn fetch_insights(&self, domain: Domain) -> Result<Vec<Insight>, ConsoleError>;
    async fn upload_dataset(
        &self,
        domain: Domain,
        file: &Path,
        progress: ProgressFn,
    ) -> Result<DatasetSummary, ConsoleError>;
    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, ConsoleError>;
}

#[derive(Clone)]
pub struct AnalyticsHttpClient {
    client: Client,
    base_url: String,
}

impl AnalyticsHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ConsoleError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("insightify-console/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ConsoleError::ApiHttp(err.to_string()))?,
        );
        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| ConsoleError::ApiHttp(err.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ConsoleError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn data_url(&self, domain: Domain, tail: &str) -> String {
        format!("{}/data/{}/{}", self.base_url, domain.api_slug(), tail)
    }

    /// One GET against a data endpoint. Any transport error or error status
    /// collapses to `DataUnavailable` for that (domain, kind): whether the
    /// dataset was never uploaded or the backend faulted, the section is
    /// simply not renderable. No retries; a failure is terminal for the load.
    async fn data_get<T: DeserializeOwned>(
        &self,
        domain: Domain,
        kind: DataKind,
        url: String,
    ) -> Result<T, ConsoleError> {
        let unavailable = |reason: String| {
            debug!(%domain, %kind, %reason, "data fetch unavailable");
            ConsoleError::DataUnavailable { domain, kind }
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("status {}", response.status().as_u16())));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ConsoleError::InvalidPayload(format!("{domain} {kind}: {err}")))
    }

    async fn error_message(response: Response) -> String {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) if !body.is_empty() => format!("status {status}: {body}"),
            _ => format!("status {status}"),
        }
    }
}

#[async_trait]
impl AnalyticsApi for AnalyticsHttpClient {
    async fn fetch_kpis(&self, domain: Domain) -> Result<DomainKpis, ConsoleError> {
        let url = self.data_url(domain, "kpis");
        let value: Value = self.data_get(domain, DataKind::Kpis, url).await?;
        DomainKpis::from_value(domain, value)
    }

    async fn fetch_preview(&self, domain: Domain) -> Result<Vec<PreviewRecord>, ConsoleError> {
        let url = self.data_url(domain, "preview");
        self.data_get(domain, DataKind::Preview, url).await
    }

    async fn fetch_stats(&self, domain: Domain) -> Result<StatsSummary, ConsoleError> {
        let url = self.data_url(domain, "stats");
        self.data_get(domain, DataKind::Stats, url).await
    }

    async fn fetch_segmentation(
        &self,
        domain: Domain,
        n_clusters: u32,
    ) -> Result<Segmentation, ConsoleError> {
        let url = self.data_url(domain, &format!("segmentation?n_clusters={n_clusters}"));
        let segmentation: Segmentation =
            self.data_get(domain, DataKind::Segmentation, url).await?;
        segmentation.validate()
    }

    async fn fetch_insights(&self, domain: Domain) -> Result<Vec<Insight>, ConsoleError> {
        let url = self.data_url(domain, "insights");
        self.data_get(domain, DataKind::Insights, url).await
    }

    async fn upload_dataset(
        &self,
        domain: Domain,
        file: &Path,
        progress: ProgressFn,
    ) -> Result<DatasetSummary, ConsoleError> {
        let failed = |message: String| ConsoleError::UploadFailed { domain, message };

        let total = tokio::fs::metadata(file)
            .await
            .map_err(|err| ConsoleError::Filesystem(err.to_string()))?
            .len();
        let handle = tokio::fs::File::open(file)
            .await
            .map_err(|err| ConsoleError::Filesystem(err.to_string()))?;

        // Count bytes as chunks leave for the wire and translate the running
        // total into a percentage for the observer.
        let sent = Arc::new(AtomicU64::new(0));
        let observer = Arc::clone(&progress);
        let counting = ReaderStream::new(handle).map_ok(move |chunk| {
            let done = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if total > 0 {
                observer((done * 100 / total).min(100) as u8);
            }
            chunk
        });

        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.csv".to_string());
        let part = Part::stream_with_length(Body::wrap_stream(counting), total)
            .file_name(filename)
            .mime_str("text/csv")
            .map_err(|err| failed(err.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("dataset_type", domain.api_slug());

        let response = self
            .client
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|err| failed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(Self::error_message(response).await));
        }
        let summary = response
            .json::<DatasetSummary>()
            .await
            .map_err(|err| failed(err.to_string()))?;
        progress(100);
        Ok(summary)
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, ConsoleError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|err| ConsoleError::AuthFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ConsoleError::AuthFailed(Self::error_message(response).await));
        }
        response
            .json::<AuthSession>()
            .await
            .map_err(|err| ConsoleError::AuthFailed(err.to_string()))
    }
}
