//! OpenAlex search API queries.

use std::time::Duration;

use crate::TitleCandidate;

pub async fn search_by_title(
    client: &reqwest::Client,
    title: &str,
    timeout: Duration,
) -> Result<Vec<TitleCandidate>, String> {
    let url = format!(
        "https://api.openalex.org/works?search={}&per-page=5",
        urlencoding::encode(title)
    );
    let resp = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
    let results = body["results"].as_array().cloned().unwrap_or_default();

    let mut out = Vec::new();
    for item in results {
        let (Some(doi), Some(title)) = (item["doi"].as_str(), item["title"].as_str()) else {
            continue;
        };
        let doi = doi
            .trim_start_matches("https://doi.org/")
            .trim_start_matches("http://doi.org/")
            .to_string();
        if doi.is_empty() || title.is_empty() {
            continue;
        }
        out.push(TitleCandidate {
            doi,
            title: title.to_string(),
            issued_year: item["publication_year"].as_i64().map(|y| y as i32),
        });
    }
    Ok(out)
}
