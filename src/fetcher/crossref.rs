// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! CrossRef REST API client

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use regex::Regex;
use serde::Deserialize;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Identifier, MetadataSource};
use crate::config::ApiConfig;
use crate::metadata::MetadataRecord;
use crate::{RenamerError, Result};

const USER_AGENT: &str = concat!(
    "paper-renamer/",
    env!("CARGO_PKG_VERSION"),
    " (https://gitlab.com/hyperpolymath/paper-renamer)"
);

/// DOI used to check that the API answers
const HEALTH_CHECK_DOI: &str = "10.1038/nature12373";

#[derive(Deserialize)]
struct WorkResponse {
    status: String,
    message: Work,
}

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    message: SearchMessage,
}

#[derive(Deserialize)]
struct SearchMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<Author>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    published: Option<DateParts>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    issued: Option<DateParts>,
    created: Option<DateParts>,
}

#[derive(Deserialize)]
struct Author {
    given: Option<String>,
    family: Option<String>,
    /// Organizations carry a single name instead of given/family
    name: Option<String>,
}

#[derive(Deserialize)]
struct DateParts {
    // CrossRef writes [[null]] for unknown dates
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    fn year(&self) -> Option<i32> {
        self.date_parts.first().and_then(|p| p.first().copied().flatten())
    }
}

impl Work {
    fn into_record(self) -> MetadataRecord {
        let year = [
            &self.published,
            &self.published_print,
            &self.published_online,
            &self.issued,
            &self.created,
        ]
        .into_iter()
        .flatten()
        .find_map(DateParts::year);

        let author = self.author.into_iter().next().and_then(|a| a.family.or(a.name).or(a.given));
        let title = self.title.into_iter().next().map(|t| strip_markup(&t));
        let journal = self.container_title.into_iter().next().map(|t| strip_markup(&t));

        MetadataRecord::new(year, author, title, journal)
    }
}

fn markup_tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9:]*(\s[^<>]*)?/?>").expect("valid regex"))
}

fn entity_regex() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos|nbsp);").expect("valid regex"))
}

/// Remove inline markup such as `<i>` or `<sub>` that CrossRef keeps in
/// titles, then decode character entities. A bare `<` is text.
fn strip_markup(text: &str) -> String {
    let without_tags = markup_tag_regex().replace_all(text, "");
    entity_regex()
        .replace_all(&without_tags, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => {
                    let code = match entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// CrossRef client
pub struct CrossRefClient {
    client: Client,
    base_url: Url,
    mailto: Option<String>,
    retries: u32,
    retry_delay: Duration,
}

impl CrossRefClient {
    /// Create a new CrossRef client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| RenamerError::Config(format!("Invalid API URL {:?}: {}", config.base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            mailto: config.mailto.clone().filter(|m| !m.trim().is_empty()),
            retries: config.retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay before the first retry; doubles on each further attempt
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Check that the API is reachable and answers a known DOI
    pub async fn health_check(&self) -> Result<()> {
        match self.get_work(HEALTH_CHECK_DOI).await? {
            Some(_) => Ok(()),
            None => Err(RenamerError::Api {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("reference DOI {} not found", HEALTH_CHECK_DOI),
            }),
        }
    }

    /// Fetch a single work by DOI
    pub async fn get_work(&self, doi: &str) -> Result<Option<MetadataRecord>> {
        let mut segments = vec!["works"];
        segments.extend(doi.split('/').filter(|s| !s.is_empty()));
        let url = self.endpoint(&segments)?;
        debug!("CrossRef work URL: {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: WorkResponse = check_status(response).await?.json().await?;
        ensure_ok(&body.status)?;
        Ok(Some(body.message.into_record()))
    }

    /// Best bibliographic match for free text
    pub async fn search(&self, query: &str) -> Result<Option<MetadataRecord>> {
        let mut url = self.endpoint(&["works"])?;
        url.query_pairs_mut()
            .append_pair("query.bibliographic", query)
            .append_pair("rows", "1");
        debug!("CrossRef search URL: {}", url);

        let response = self.client.get(url).send().await?;
        let body: SearchResponse = check_status(response).await?.json().await?;
        ensure_ok(&body.status)?;
        Ok(body.message.items.into_iter().next().map(Work::into_record))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RenamerError::Config(format!("API URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        Ok(url)
    }

    /// Run a request, retrying transient failures with exponential back-off
    async fn with_retry<T, F, Fut>(&self, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match request().await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    let delay = self.retry_delay * 2u32.pow(attempt - 1);
                    warn!("Retrying CrossRef request in {:?} (attempt {}): {}", delay, attempt + 1, e);
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RenamerError::RateLimited);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RenamerError::Api {
        status: status.as_u16(),
        message: message.chars().take(200).collect(),
    })
}

fn ensure_ok(status: &str) -> Result<()> {
    if status == "ok" {
        Ok(())
    } else {
        Err(RenamerError::Api {
            status: StatusCode::OK.as_u16(),
            message: format!("CrossRef reported status {:?}", status),
        })
    }
}

#[async_trait]
impl MetadataSource for CrossRefClient {
    fn name(&self) -> &'static str {
        "crossref"
    }

    async fn lookup(&self, identifier: &Identifier) -> Result<Option<MetadataRecord>> {
        match identifier {
            Identifier::Doi(doi) => self.with_retry(|| self.get_work(doi)).await,
            Identifier::Query(query) => self.with_retry(|| self.search(query)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, retries: u32) -> CrossRefClient {
        let config = ApiConfig {
            base_url: server.uri(),
            mailto: Some("someone@example.org".to_string()),
            retries,
            ..ApiConfig::default()
        };
        CrossRefClient::new(&config).unwrap().with_retry_delay(Duration::ZERO)
    }

    fn work_json() -> serde_json::Value {
        json!({
            "status": "ok",
            "message": {
                "DOI": "10.1234/abc",
                "title": ["Room temperature plasticity in amorphous SiO<sub>2</sub>"],
                "author": [
                    {"given": "Wei", "family": "Zhang", "sequence": "first"},
                    {"given": "Erik", "family": "Other", "sequence": "additional"}
                ],
                "container-title": ["Physical Review Letters"],
                "published": {"date-parts": [[null]]},
                "created": {"date-parts": [[2024, 2, 1]]}
            }
        })
    }

    #[tokio::test]
    async fn test_get_work_by_doi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/10.1234/abc"))
            .and(query_param("mailto", "someone@example.org"))
            .respond_with(ResponseTemplate::new(200).set_body_json(work_json()))
            .mount(&server)
            .await;

        let record = client_for(&server, 0)
            .lookup(&Identifier::Doi("10.1234/abc".to_string()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.year, Some(2024));
        assert_eq!(record.author.as_deref(), Some("Zhang"));
        assert_eq!(record.title.as_deref(), Some("Room temperature plasticity in amorphous SiO2"));
        assert_eq!(record.journal.as_deref(), Some("Physical Review Letters"));
    }

    #[tokio::test]
    async fn test_unknown_doi_is_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/10.1234/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Resource not found."))
            .mount(&server)
            .await;

        let result = client_for(&server, 0)
            .lookup(&Identifier::Doi("10.1234/missing".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_bibliographic_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .and(query_param("query.bibliographic", "grain boundaries"))
            .and(query_param("rows", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": {
                    "items": [{
                        "title": ["Grain boundaries"],
                        "author": [{"name": "The Consortium"}],
                        "issued": {"date-parts": [[1999]]}
                    }]
                }
            })))
            .mount(&server)
            .await;

        let record = client_for(&server, 0)
            .lookup(&Identifier::Query("grain boundaries".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.author.as_deref(), Some("The Consortium"));
        assert_eq!(record.journal, None);
    }

    #[tokio::test]
    async fn test_empty_search_is_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": {"items": []}
            })))
            .mount(&server)
            .await;

        let result = client_for(&server, 0).search("nothing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/10.1234/abc"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/works/10.1234/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(work_json()))
            .mount(&server)
            .await;

        let record = client_for(&server, 2)
            .lookup(&Identifier::Doi("10.1234/abc".to_string()))
            .await
            .unwrap();
        assert!(record.is_some());
    }

    #[tokio::test]
    async fn test_rate_limit_without_retries_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 0)
            .lookup(&Identifier::Doi("10.1234/abc".to_string()))
            .await;
        assert!(matches!(result, Err(RenamerError::RateLimited)));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3)
            .lookup(&Identifier::Query("x".to_string()))
            .await;
        match result {
            Err(RenamerError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad query");
            }
            other => panic!("expected API error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("H<sub>2</sub>O in <i>vivo</i>"), "H2O in vivo");
        assert_eq!(strip_markup("a > b"), "a > b");
        assert_eq!(strip_markup("<jats:title>Grain growth</jats:title>"), "Grain growth");
    }

    #[test]
    fn test_strip_markup_keeps_bare_angle_brackets() {
        assert_eq!(strip_markup("Creep at T < 300 K and beyond"), "Creep at T < 300 K and beyond");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        assert_eq!(strip_markup("<i>In situ</i> TEM of Cu &amp; Ni"), "In situ TEM of Cu & Ni");
        assert_eq!(strip_markup("&lt;111&gt; dislocations"), "<111> dislocations");
        assert_eq!(strip_markup("Schr&#246;dinger &#x3B1;-Fe"), "Schrödinger α-Fe");
        assert_eq!(strip_markup("AT&T &bogus;"), "AT&T &bogus;");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ApiConfig {
            base_url: "::not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(CrossRefClient::new(&config), Err(RenamerError::Config(_))));
    }
}
