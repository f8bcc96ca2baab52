//! HTTP gateway to the upstream search form.
//!
//! Stands in for the browser-automation layer: submits synthetic form
//! field values and reads back rendered HTML. Every request is paced by a
//! rate limiter and bounded by the configured navigation timeout. One
//! gateway corresponds to one browser context; parallel workers each build
//! their own.

use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{direct::NotKeyed, InMemoryState};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::crawling::executor::SearchGateway;
use crate::domain::dimensions::{DimensionSource, Dimensions, RefinementKind};
use crate::domain::partition::PartitionKey;
use crate::error::{HarvestError, Result};
use crate::infrastructure::config::SiteConfig;
use crate::infrastructure::page_parser;

// Selection popups the search form opens for each dimension.
const UNIVERSITY_POPUP: &str = "uniEkle.jsp";
const INSTITUTE_POPUP: &str = "ensEkle.jsp";
const SUBJECT_POPUP: &str = "konuEkle.jsp";

pub struct HttpGateway {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    base_url: Url,
    timeout: Duration,
    min_year: u32,
}

impl HttpGateway {
    pub fn new(site: &SiteConfig, min_year: u32) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&site.user_agent)
                .map_err(|e| HarvestError::Config(format!("invalid user agent: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&site.base_url)
            .map_err(|e| HarvestError::Config(format!("invalid base url {}: {e}", site.base_url)))?;

        let rate_limiter = if site.request_delay_ms == 0 {
            None
        } else {
            let quota = Quota::with_period(Duration::from_millis(site.request_delay_ms))
                .ok_or_else(|| HarvestError::Config("request delay must be positive".into()))?;
            Some(RateLimiter::direct(quota))
        };

        Ok(Self {
            client,
            rate_limiter,
            base_url,
            timeout: Duration::from_secs(site.navigation_timeout_secs),
            min_year,
        })
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    async fn fetch_page(&self, url: Url) -> Result<String> {
        self.pace().await;
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HarvestError::from_transport(&e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(HarvestError::Navigation {
                reason: format!("HTTP {} from {}", response.status(), url),
            });
        }

        response
            .text()
            .await
            .map_err(|e| HarvestError::from_transport(&e, self.timeout.as_secs()))
    }

    async fn fetch_popup(&self, path: &str) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| HarvestError::Dimension(format!("bad popup path {path}: {e}")))?;
        self.fetch_page(url).await
    }
}

#[async_trait]
impl SearchGateway for HttpGateway {
    async fn submit(&self, filter: &PartitionKey) -> Result<String> {
        self.pace().await;

        // The year range collapses to a single year; refinements add at
        // most one secondary field pair each.
        let mut form: Vec<(&str, String)> = vec![
            ("uni", filter.university.id.clone()),
            ("uniad", filter.university.name.clone()),
            ("yil1", filter.year.clone()),
            ("yil2", filter.year.clone()),
        ];
        for (kind, value) in &filter.refinements {
            match kind {
                RefinementKind::ThesisType => form.push(("Tur", value.id.clone())),
                RefinementKind::Institute => {
                    form.push(("ens", value.id.clone()));
                    form.push(("ensad", value.name.clone()));
                }
                RefinementKind::Subject => {
                    form.push(("konu", value.id.clone()));
                    form.push(("konuad", value.name.clone()));
                }
            }
        }

        debug!("Submitting search | {}", filter.describe());
        let response = self
            .client
            .post(self.base_url.clone())
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HarvestError::from_transport(&e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            return Err(HarvestError::Navigation {
                reason: format!("HTTP {} from search form", response.status()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| HarvestError::from_transport(&e, self.timeout.as_secs()))
    }
}

#[async_trait]
impl DimensionSource for HttpGateway {
    async fn fetch_dimensions(&self) -> Result<Dimensions> {
        info!("Fetching partitioning dimensions from {}", self.base_url);

        let form_html = self.fetch_page(self.base_url.clone()).await?;
        let years = page_parser::parse_year_options(&form_html, self.min_year)?;
        let thesis_types = page_parser::parse_thesis_type_options(&form_html)?;

        let universities =
            page_parser::parse_dimension_links(&self.fetch_popup(UNIVERSITY_POPUP).await?)?;
        let institutes =
            page_parser::parse_dimension_links(&self.fetch_popup(INSTITUTE_POPUP).await?)?;
        let subjects =
            page_parser::parse_dimension_links(&self.fetch_popup(SUBJECT_POPUP).await?)?;

        if universities.is_empty() {
            return Err(HarvestError::Dimension(
                "university popup yielded no entries".into(),
            ));
        }
        if years.is_empty() {
            return Err(HarvestError::Dimension(
                "search form yielded no year options".into(),
            ));
        }

        info!(
            "Found {} universities, {} institutes, {} subjects, {} thesis types, {} years",
            universities.len(),
            institutes.len(),
            subjects.len(),
            thesis_types.len(),
            years.len()
        );

        Ok(Dimensions {
            universities,
            institutes,
            subjects,
            thesis_types,
            years,
        })
    }
}
