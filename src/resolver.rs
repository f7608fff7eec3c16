//! Source resolution — turns a submission into downloadable media metadata.
//!
//! The lifecycle manager consumes resolution through the [`Resolver`] trait so
//! implementations can be swapped (or stubbed in tests). [`SiteResolver`] is
//! the built-in implementation: it recognizes a fixed set of audio hosts and
//! scrapes each host's page for the media URL and display title.

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::ResolutionError;
use crate::types::{DownloadInfo, DownloadInput};

/// Capability that resolves a submission into [`DownloadInfo`]
///
/// Implementations may be slow and may fail; the lifecycle manager bounds each
/// call with a deadline and records failures on the job, so implementations
/// only need to report errors, not handle retries or timeouts.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `input` into downloadable media metadata
    async fn resolve(&self, input: &DownloadInput) -> Result<DownloadInfo, ResolutionError>;

    /// Human-readable implementation name, for logging
    fn name(&self) -> &str {
        "resolver"
    }
}

/// Hostname regex pattern from the URI spec: <https://www.rfc-editor.org/rfc/rfc3986#appendix-B>
const URL_PATTERN: &str = r"^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?";

/// Pattern matching bracketed tags stripped from scraped titles
const TITLE_TAG_PATTERN: &str = r"(\[.+?\])";

/// Built-in resolver for the supported audio hosts
///
/// Recognizes soundgasm.net, whyp.it, and vocaroo.com. The first two are
/// resolved by fetching the page and scraping it for the media URL and title;
/// vocaroo media URLs are synthesized directly from the page path.
pub struct SiteResolver {
    client: reqwest::Client,
}

impl SiteResolver {
    /// Create a resolver with its own HTTP client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a resolver that shares an existing HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch `url` and scrape it for the media URL, title, and extension
    async fn info_from_page(
        &self,
        url: &str,
        audio_pattern: &str,
        title_selector: &str,
    ) -> Result<(String, String, String), ResolutionError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ResolutionError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        let html = response
            .text()
            .await
            .map_err(|e| ResolutionError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        extract_from_page(url, &html, audio_pattern, title_selector)
    }
}

impl Default for SiteResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for SiteResolver {
    async fn resolve(&self, input: &DownloadInput) -> Result<DownloadInfo, ResolutionError> {
        let url_re = Regex::new(URL_PATTERN).map_err(|e| ResolutionError::Other(e.to_string()))?;
        let captures = url_re
            .captures(&input.url)
            .ok_or_else(|| ResolutionError::InvalidUrl {
                url: input.url.clone(),
                reason: "failed to match hostname".to_string(),
            })?;
        let hostname = captures
            .get(4)
            .ok_or_else(|| ResolutionError::InvalidUrl {
                url: input.url.clone(),
                reason: "URL contains no valid hostname".to_string(),
            })?
            .as_str();

        tracing::debug!(url = %input.url, hostname, "resolving source page");

        let info = match () {
            _ if hostname.contains("soundgasm.net") => {
                let (audio, title, extension) = self
                    .info_from_page(
                        &input.url,
                        r#"(https://media\.soundgasm\.net/sounds/[^\r\n\t\f\v"]+)"#,
                        "div.jp-title",
                    )
                    .await?;
                DownloadInfo::new(audio, title, extension)
            }
            _ if hostname.contains("whyp.it") => {
                let (audio, title, extension) = self
                    .info_from_page(
                        &input.url,
                        r#"(https:\\u002F\\u002Fcdn\.whyp\.it\\u002F[^\r\n\t\f\v"]+)"#,
                        "h1",
                    )
                    .await?;
                DownloadInfo::new(audio, title, extension)
                    .with_header("referer", "https://whyp.it/")
            }
            _ if hostname.contains("vocaroo.com") => {
                let id = captures
                    .get(5)
                    .map(|m| m.as_str())
                    .filter(|path| !path.is_empty() && *path != "/")
                    .ok_or_else(|| ResolutionError::InvalidUrl {
                        url: input.url.clone(),
                        reason: "URL contains no valid id".to_string(),
                    })?;
                DownloadInfo::new(
                    format!("https://media1.vocaroo.com/mp3{id}"),
                    format!("Vocaroo {id}"),
                    "mp3",
                )
                .with_header("referer", "https://vocaroo.com/")
            }
            _ => return Err(ResolutionError::UnsupportedHost(input.url.clone())),
        };

        tracing::debug!(url = %input.url, title = %info.title, "resolved source page");
        Ok(info)
    }

    fn name(&self) -> &str {
        "site-resolver"
    }
}

/// Scrape an already-fetched page for the media URL, title, and extension
fn extract_from_page(
    url: &str,
    html: &str,
    audio_pattern: &str,
    title_selector: &str,
) -> Result<(String, String, String), ResolutionError> {
    let audio_re =
        Regex::new(audio_pattern).map_err(|e| ResolutionError::Other(e.to_string()))?;
    let raw_audio = audio_re
        .captures(html)
        .and_then(|caps| caps.get(0))
        .ok_or_else(|| ResolutionError::MissingMetadata {
            url: url.to_string(),
            what: "a valid audio url".to_string(),
        })?
        .as_str();

    // Some hosts embed the media URL JSON-escaped (e.g. / for slashes);
    // round-tripping through a JSON string literal unescapes it.
    let audio: String = serde_json::from_str(&format!("\"{raw_audio}\"")).map_err(|e| {
        ResolutionError::MissingMetadata {
            url: url.to_string(),
            what: format!("a decodable audio url ({e})"),
        }
    })?;

    let extension = audio
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| ResolutionError::MissingMetadata {
            url: url.to_string(),
            what: "an audio url with a file extension".to_string(),
        })?
        .to_owned();

    let document = Html::parse_document(html);
    let selector = Selector::parse(title_selector)
        .map_err(|e| ResolutionError::Other(e.to_string()))?;
    let raw_title: String = document
        .select(&selector)
        .next()
        .ok_or_else(|| ResolutionError::MissingMetadata {
            url: url.to_string(),
            what: "a title".to_string(),
        })?
        .text()
        .collect();

    let tag_re =
        Regex::new(TITLE_TAG_PATTERN).map_err(|e| ResolutionError::Other(e.to_string()))?;
    let title = tag_re.replace_all(&raw_title, "").trim().to_owned();

    Ok((audio, title, extension))
}
