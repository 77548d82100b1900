//! `config.json` loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::aggregator::FilterCriteria;
use crate::browser::ChromeOptions;
use crate::error::ConfigError;
use crate::models::Origin;
use crate::orchestrator::SourceJob;
use crate::pagination::PaginationLimits;
use crate::scrapers::adapter_for;

/// A start URL, either a single string or a list of them
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StartUrls {
    One(String),
    Many(Vec<String>),
}

impl StartUrls {
    /// Non-blank URLs, trimmed.
    pub fn urls(&self) -> Vec<String> {
        let urls: &[String] = match self {
            StartUrls::One(url) => std::slice::from_ref(url),
            StartUrls::Many(urls) => urls,
        };
        urls.iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub start_url: StartUrls,
}

/// Crawl bounds and browser behaviour
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Wall-clock budget per source, shared by all of its start URLs
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default = "default_headless")]
    pub headless: bool,
}

fn default_max_pages() -> u32 {
    50
}

fn default_source_timeout_secs() -> u64 {
    900
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_settle_millis() -> u64 {
    1500
}

fn default_headless() -> bool {
    true
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            source_timeout_secs: default_source_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_millis: default_settle_millis(),
            headless: default_headless(),
        }
    }
}

impl CrawlConfig {
    pub fn pagination_limits(&self) -> PaginationLimits {
        PaginationLimits {
            max_pages: self.max_pages.max(1),
            deadline: (self.source_timeout_secs > 0).then(|| Duration::from_secs(self.source_timeout_secs)),
        }
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            settle: Duration::from_millis(self.settle_millis),
        }
    }
}

/// On-disk shape; sources are optional here only so a missing one can be
/// reported by name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    olx: Option<SourceConfig>,
    viva_real: Option<SourceConfig>,
    zap_imoveis: Option<SourceConfig>,
    netimoveis: Option<SourceConfig>,
    #[serde(default)]
    filter: FilterCriteria,
    #[serde(default)]
    crawl: CrawlConfig,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Start URLs per source, in `Origin::ALL` order
    pub sources: Vec<(Origin, Vec<String>)>,
    pub filter: FilterCriteria,
    pub crawl: CrawlConfig,
}

impl Config {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let mut sources = Vec::with_capacity(Origin::ALL.len());
        for (origin, source) in [
            (Origin::Olx, raw.olx),
            (Origin::VivaReal, raw.viva_real),
            (Origin::ZapImoveis, raw.zap_imoveis),
            (Origin::NetImoveis, raw.netimoveis),
        ] {
            let source = source.ok_or(ConfigError::MissingSource(origin.key()))?;
            let urls = source.start_url.urls();
            if urls.is_empty() {
                return Err(ConfigError::NoStartUrls(origin.key()));
            }
            sources.push((origin, urls));
        }

        if raw.filter.min_total > raw.filter.max_total {
            return Err(ConfigError::EmptyRange {
                min: raw.filter.min_total,
                max: raw.filter.max_total,
            });
        }

        Ok(Self {
            sources,
            filter: raw.filter,
            crawl: raw.crawl,
        })
    }

    /// One crawl job per configured source.
    pub fn jobs(&self) -> Vec<SourceJob> {
        self.sources
            .iter()
            .map(|(origin, urls)| SourceJob {
                adapter: adapter_for(*origin),
                start_urls: urls.clone(),
            })
            .collect()
    }

    pub fn start_url_count(&self) -> usize {
        self.sources.iter().map(|(_, urls)| urls.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "olx": { "startUrl": "https://www.olx.com.br/imoveis/aluguel/estado-mg/belo-horizonte-e-regiao" },
        "viva-real": { "startUrl": ["https://www.vivareal.com.br/aluguel/minas-gerais/belo-horizonte/", "  "] },
        "zap-imoveis": { "startUrl": "https://www.zapimoveis.com.br/aluguel/imoveis/mg+belo-horizonte/" },
        "netimoveis": { "startUrl": [
            "https://www.netimoveis.com/locacao/minas-gerais/belo-horizonte/centro",
            "https://www.netimoveis.com/locacao/minas-gerais/belo-horizonte/savassi"
        ] },
        "filter": { "maxTotal": 2000 },
        "crawl": { "maxPages": 10, "headless": false }
    }"#;

    #[test]
    fn parses_string_and_list_start_urls() {
        let config = Config::from_json(FULL).unwrap();

        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.sources[1].0, Origin::VivaReal);
        assert_eq!(config.sources[1].1.len(), 1);
        assert_eq!(config.sources[3].1.len(), 2);
        assert_eq!(config.start_url_count(), 5);
        assert_eq!(config.jobs()[2].adapter.origin(), Origin::ZapImoveis);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = Config::from_json(FULL).unwrap();

        assert_eq!(
            config.filter,
            FilterCriteria {
                min_total: 1300,
                max_total: 2000,
                min_area: 35,
            }
        );
        assert_eq!(config.crawl.max_pages, 10);
        assert!(!config.crawl.headless);
        assert_eq!(config.crawl.source_timeout_secs, 900);
        assert_eq!(
            config.crawl.pagination_limits().deadline,
            Some(Duration::from_secs(900))
        );
        assert_eq!(config.crawl.chrome_options().settle, Duration::from_millis(1500));
    }

    #[test]
    fn missing_source_is_named() {
        let json = r#"{
            "olx": { "startUrl": "https://olx" },
            "viva-real": { "startUrl": "https://vr" },
            "netimoveis": { "startUrl": "https://ni" }
        }"#;

        let err = Config::from_json(json).unwrap_err();

        assert!(matches!(err, ConfigError::MissingSource("zap-imoveis")));
    }

    #[test]
    fn blank_start_urls_are_rejected() {
        let json = r#"{
            "olx": { "startUrl": [] },
            "viva-real": { "startUrl": "https://vr" },
            "zap-imoveis": { "startUrl": "https://zi" },
            "netimoveis": { "startUrl": "https://ni" }
        }"#;

        assert!(matches!(
            Config::from_json(json).unwrap_err(),
            ConfigError::NoStartUrls("olx")
        ));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let json = r#"{
            "olx": { "startUrl": "https://olx" },
            "viva-real": { "startUrl": "https://vr" },
            "zap-imoveis": { "startUrl": "https://zi" },
            "netimoveis": { "startUrl": "https://ni" },
            "filter": { "minTotal": 2000, "maxTotal": 1000 }
        }"#;

        assert!(matches!(
            Config::from_json(json).unwrap_err(),
            ConfigError::EmptyRange { min: 2000, max: 1000 }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(Config::from_json("{ olx"), Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = Config::from_file("/definitely/not/here/config.json").await.unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[tokio::test]
    async fn reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, FULL).await.unwrap();

        let config = Config::from_file(&path).await.unwrap();

        assert_eq!(config.start_url_count(), 5);
    }
}
