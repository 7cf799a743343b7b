//! Console and script error triage

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{QcError, Result};

/// Where a captured message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Uncaught exception in page script
    PageError,
    /// `console.error(...)` or a browser-logged error
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub source: MessageSource,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ConsoleMessage {
    fn haystack(&self) -> String {
        match &self.url {
            Some(url) => format!("{} {}", self.text, url),
            None => self.text.clone(),
        }
    }
}

/// Messages split into critical and known-benign
#[derive(Debug, Clone, Default)]
pub struct Triage {
    pub critical: Vec<ConsoleMessage>,
    pub benign: Vec<ConsoleMessage>,
}

/// Filters out console noise that does not indicate a broken page
pub struct ConsoleFilter {
    benign: Vec<Regex>,
}

impl ConsoleFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let benign = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| QcError::ContractParse(format!("bad console pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { benign })
    }

    pub fn is_benign(&self, message: &ConsoleMessage) -> bool {
        let haystack = message.haystack();
        self.benign.iter().any(|re| re.is_match(&haystack))
    }

    pub fn triage(&self, messages: Vec<ConsoleMessage>) -> Triage {
        let (benign, critical) = messages.into_iter().partition(|m| self.is_benign(m));
        Triage { critical, benign }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteContract;
    use test_case::test_case;

    fn console(text: &str, url: Option<&str>) -> ConsoleMessage {
        ConsoleMessage {
            source: MessageSource::Console,
            text: text.to_string(),
            url: url.map(String::from),
        }
    }

    #[test_case("Failed to load resource: the server responded with a status of 404 (Not Found)", Some("https://site.test/favicon.ico") ; "missing favicon")]
    #[test_case("Failed to load resource: net::ERR_FILE_NOT_FOUND", None ; "file not found")]
    #[test_case("downloadable font: download failed", Some("https://site.test/fonts/inter.woff2") ; "missing font")]
    fn test_benign_messages(text: &str, url: Option<&str>) {
        let filter = ConsoleFilter::new(&SiteContract::default().benign_console_patterns).unwrap();
        assert!(filter.is_benign(&console(text, url)));
    }

    #[test_case(MessageSource::PageError, "Uncaught TypeError: Cannot read properties of undefined (reading 'map')", None ; "type error")]
    #[test_case(MessageSource::PageError, "ReferenceError: renderTicker is not defined", None ; "reference error")]
    #[test_case(MessageSource::Console, "Failed to load resource: the server responded with a status of 500 (Internal Server Error)", Some("https://site.test/js/ticker.js") ; "server error on script")]
    #[test_case(MessageSource::Console, "Failed to load resource: net::ERR_CONNECTION_REFUSED", Some("https://site.test/data/trending.json") ; "fixture refused")]
    fn test_critical_messages(source: MessageSource, text: &str, url: Option<&str>) {
        let filter = ConsoleFilter::new(&SiteContract::default().benign_console_patterns).unwrap();
        let message = ConsoleMessage {
            source,
            text: text.to_string(),
            url: url.map(String::from),
        };
        assert!(!filter.is_benign(&message));
    }

    #[test]
    fn test_triage_partitions() {
        let filter = ConsoleFilter::new(&["favicon".to_string()]).unwrap();
        let triage = filter.triage(vec![
            console("GET /FAVICON.ico 404", None),
            console("boom", None),
        ]);
        assert_eq!(triage.benign.len(), 1);
        assert_eq!(triage.critical.len(), 1);
        assert_eq!(triage.critical[0].text, "boom");
    }
}
