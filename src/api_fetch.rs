use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::http_client::{api_base, http_client};
use crate::state::{Metric, RankEntry, Region, Sport};

pub const DEFAULT_TOP_N: usize = 10;

pub fn fetch_sports() -> Result<Vec<Sport>> {
    let body = get_body("/api/sports", &[]).context("sports request failed")?;
    parse_sports_json(&body)
}

pub fn fetch_regions() -> Result<Vec<Region>> {
    let body = get_body("/api/regions", &[]).context("regions request failed")?;
    parse_regions_json(&body)
}

pub fn fetch_metrics(sport: &str) -> Result<Vec<Metric>> {
    let body = get_body("/api/metrics", &[("sport", sport)])
        .with_context(|| format!("metrics request failed for {sport}"))?;
    parse_metrics_json(&body)
}

pub fn fetch_rank(sport: &str, top_n: usize) -> Result<Vec<RankEntry>> {
    let top_n = top_n.max(1).to_string();
    let body = get_body("/api/rank", &[("sport", sport), ("top_n", top_n.as_str())])
        .with_context(|| format!("rank request failed for {sport}"))?;
    parse_rank_json(&body)
}

fn get_body(path: &str, query: &[(&str, &str)]) -> Result<String> {
    let client = http_client()?;
    let url = format!("{}{path}", api_base());
    let response = client
        .get(&url)
        .query(query)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    response.text().context("reading response body")
}

pub fn parse_sports_json(raw: &str) -> Result<Vec<Sport>> {
    parse_array(raw).context("invalid sports json")
}

pub fn parse_regions_json(raw: &str) -> Result<Vec<Region>> {
    parse_array(raw).context("invalid regions json")
}

pub fn parse_metrics_json(raw: &str) -> Result<Vec<Metric>> {
    parse_array(raw).context("invalid metrics json")
}

pub fn parse_rank_json(raw: &str) -> Result<Vec<RankEntry>> {
    parse_array(raw).context("invalid rank json")
}

fn parse_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed)
}
