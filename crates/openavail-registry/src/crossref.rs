//! Crossref REST API queries.

use std::time::Duration;

use crate::{RegistryRecord, TitleCandidate};

const USER_AGENT: &str = "OpenAvailabilityMiner/0.2 (availability-statement research tool)";

pub async fn lookup(
    client: &reqwest::Client,
    doi: &str,
    timeout: Duration,
) -> Result<Option<RegistryRecord>, String> {
    let url = format!(
        "https://api.crossref.org/works/{}",
        urlencoding::encode(doi)
    );
    let resp = client
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if resp.status().as_u16() == 404 {
        return Ok(None);
    }
    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
    let msg = &body["message"];
    let title = first_string(&msg["title"]);
    let Some(title) = title else {
        return Ok(None);
    };
    Ok(Some(RegistryRecord {
        title,
        container_title: first_string(&msg["container-title"]),
        issued_year: issued_year(msg),
    }))
}

pub async fn search_by_title(
    client: &reqwest::Client,
    title: &str,
    timeout: Duration,
) -> Result<Vec<TitleCandidate>, String> {
    let url = format!(
        "https://api.crossref.org/works?query.title={}&rows=5",
        urlencoding::encode(title)
    );
    let resp = client
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
    let items = body["message"]["items"].as_array().cloned().unwrap_or_default();

    let mut out = Vec::new();
    for item in items {
        let (Some(doi), Some(title)) = (item["DOI"].as_str(), first_string(&item["title"])) else {
            continue;
        };
        out.push(TitleCandidate {
            doi: doi.to_string(),
            title,
            issued_year: issued_year(&item),
        });
    }
    Ok(out)
}

fn first_string(value: &serde_json::Value) -> Option<String> {
    value
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn issued_year(msg: &serde_json::Value) -> Option<i32> {
    msg["issued"]["date-parts"][0][0]
        .as_i64()
        .map(|y| y as i32)
}
