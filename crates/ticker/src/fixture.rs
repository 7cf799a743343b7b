//! Fixture retrieval
//!
//! The ticker reads its data exactly once per page load. A fixture lives
//! either behind an http(s) URL or on the local filesystem.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::repo::TrendingRepo;

/// Where a fixture is read from
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureSource {
    Http(Url),
    File(PathBuf),
}

impl FixtureSource {
    /// Parse a fixture location: `http(s)://...`, `file://...` or a plain path
    pub fn parse(location: &str) -> FetchResult<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(FetchError::InvalidSource("empty location".to_string()));
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location)
                .map_err(|e| FetchError::InvalidSource(format!("{}: {}", location, e)))?;
            return Ok(FixtureSource::Http(url));
        }

        if location.starts_with("file://") {
            let url = Url::parse(location)
                .map_err(|e| FetchError::InvalidSource(format!("{}: {}", location, e)))?;
            let path = url
                .to_file_path()
                .map_err(|_| FetchError::InvalidSource(location.to_string()))?;
            return Ok(FixtureSource::File(path));
        }

        Ok(FixtureSource::File(PathBuf::from(location)))
    }
}

impl std::fmt::Display for FixtureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixtureSource::Http(url) => write!(f, "{}", url),
            FixtureSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parse a fixture payload. Order is preserved; sorting happens at render time.
pub fn parse_fixture(bytes: &[u8]) -> FetchResult<Vec<TrendingRepo>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Retrieve and parse a fixture. No retries.
pub async fn load(source: &FixtureSource) -> FetchResult<Vec<TrendingRepo>> {
    debug!("Loading fixture from {}", source);

    let bytes = match source {
        FixtureSource::Http(url) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            let resp = client.get(url.clone()).send().await?;
            if !resp.status().is_success() {
                warn!("Fixture endpoint {} returned {}", url, resp.status());
                return Err(FetchError::Status(resp.status().as_u16()));
            }
            resp.bytes().await?.to_vec()
        }
        FixtureSource::File(path) => tokio::fs::read(path).await?,
    };

    let repos = parse_fixture(&bytes)?;
    debug!("Fixture {} yielded {} repos", source, repos.len());
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        assert!(matches!(
            FixtureSource::parse("https://example.com/data/trending.json").unwrap(),
            FixtureSource::Http(_)
        ));
        assert_eq!(
            FixtureSource::parse("data/trending.json").unwrap(),
            FixtureSource::File(PathBuf::from("data/trending.json"))
        );
        assert_eq!(
            FixtureSource::parse("file:///srv/site/trending.json").unwrap(),
            FixtureSource::File(PathBuf::from("/srv/site/trending.json"))
        );
        assert!(FixtureSource::parse("   ").is_err());
    }

    #[test]
    fn test_parse_fixture_preserves_order() {
        let json = br#"[
            {"name":"a","url":"https://a","stars_today":1,"language":"Go","trending_score":1.0},
            {"name":"b","url":"https://b","stars_today":2,"language":"Rust","trending_score":2.0}
        ]"#;
        let repos = parse_fixture(json).unwrap();
        assert_eq!(repos[0].name, "a");
        assert_eq!(repos[1].name, "b");
    }

    #[test]
    fn test_malformed_fixture() {
        assert!(matches!(parse_fixture(b"{not json"), Err(FetchError::Malformed(_))));
        assert!(matches!(parse_fixture(b"{\"name\":\"a\"}"), Err(FetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixtureSource::File(dir.path().join("absent.json"));
        assert!(matches!(load(&source).await, Err(FetchError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trending.json");
        std::fs::write(
            &path,
            r#"[{"name":"x/y","url":"https://github.com/x/y","stars_today":1500,"language":"Zig","trending_score":3}]"#,
        )
        .unwrap();
        let repos = load(&FixtureSource::File(path)).await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].stars_today, 1500);
    }
}
