use chrono::SecondsFormat;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use storage::models::ChallengeWindow;
use tracing::{debug, info};

use crate::error::{Result, StravaError};
use crate::models::{AthleteDetailed, SegmentDetailed, SegmentEffort};

pub const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";

const EFFORTS_PER_PAGE: u32 = 200;

/// Thin client over the Strava v3 REST API. Every call carries the access
/// token of the athlete it acts for.
#[derive(Debug, Clone)]
pub struct StravaClient {
    base_url: String,
    client: reqwest::Client,
}

impl StravaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StravaError::InvalidBaseUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("bestrida/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Efforts of `athlete_id` on a segment inside the window, earliest first.
    pub async fn segment_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
        window: &ChallengeWindow,
    ) -> Result<Vec<SegmentEffort>> {
        self.fetch_efforts(access_token, segment_id, athlete_id, Some(window))
            .await
    }

    /// Every effort of `athlete_id` on a segment, earliest first.
    pub async fn athlete_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
    ) -> Result<Vec<SegmentEffort>> {
        self.fetch_efforts(access_token, segment_id, athlete_id, None)
            .await
    }

    async fn fetch_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
        window: Option<&ChallengeWindow>,
    ) -> Result<Vec<SegmentEffort>> {
        let url = format!("{}/segments/{}/all_efforts", self.base_url, segment_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&efforts_query(athlete_id, window))
            .send()
            .await?;

        let mut efforts: Vec<SegmentEffort> = self.parse(response).await?;
        efforts.sort_by_key(|e| e.start_date);

        debug!(segment_id, athlete_id, count = efforts.len(), "Fetched segment efforts");
        Ok(efforts)
    }

    pub async fn segment(&self, access_token: &str, segment_id: i64) -> Result<SegmentDetailed> {
        let url = format!("{}/segments/{}", self.base_url, segment_id);
        info!(segment_id, "Fetching segment from Strava");

        let response = self.client.get(&url).bearer_auth(access_token).send().await?;
        self.parse(response).await
    }

    /// The athlete owning `access_token`.
    pub async fn athlete(&self, access_token: &str) -> Result<AthleteDetailed> {
        let url = format!("{}/athlete", self.base_url);

        let response = self.client.get(&url).bearer_auth(access_token).send().await?;
        self.parse(response).await
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        log_rate_limit(response.headers());

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => return Err(StravaError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StravaError::Unauthorized);
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(StravaError::UnexpectedStatus {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn efforts_query(athlete_id: i64, window: Option<&ChallengeWindow>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("athlete_id", athlete_id.to_string()),
        ("per_page", EFFORTS_PER_PAGE.to_string()),
    ];
    if let Some(window) = window {
        query.push((
            "start_date_local",
            window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        query.push((
            "end_date_local",
            window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    query
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn log_rate_limit(headers: &HeaderMap) {
    let limit = header(headers, "x-ratelimit-limit");
    let usage = header(headers, "x-ratelimit-usage");

    if let (Some(limit), Some(usage)) = (limit, usage) {
        if let Some(fraction) = rate_limit_fraction(limit, usage) {
            info!(
                limit,
                usage,
                percent = (fraction * 1000.0).round() / 10.0,
                "Strava rate limit usage"
            );
        }
    }
}

/// Highest used fraction across the short and long term windows, given the
/// `X-RateLimit-Limit` and `X-RateLimit-Usage` values ("600,30000").
fn rate_limit_fraction(limit: &str, usage: &str) -> Option<f64> {
    let parse = |raw: &str| -> Option<Vec<f64>> {
        raw.split(',')
            .map(|part| part.trim().parse::<f64>().ok())
            .collect()
    };

    let limits = parse(limit)?;
    let usages = parse(usage)?;
    if limits.is_empty() || limits.len() != usages.len() {
        return None;
    }

    limits
        .iter()
        .zip(&usages)
        .filter(|(l, _)| **l > 0.0)
        .map(|(l, u)| u / l)
        .max_by(|a, b| a.total_cmp(b))
}
