//! Static lint of a built site directory
//!
//! Runs without a browser: walks every `.html` file under the root and
//! reports broken links, missing images, leftover development markers and
//! structural problems.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico"];

/// Pages shorter than this (after trimming) are likely placeholders
const MIN_CONTENT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    BrokenLink,
    MissingImage,
    OrphanedImage,
    TodoMarker,
    EmptyFile,
    HtmlStructure,
    Javascript,
    FileRead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    /// Page relative to the root, or `global`
    pub file: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintSummary {
    pub passed: bool,
    pub score: u32,
    pub check_counts: BTreeMap<IssueCategory, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintReport {
    pub timestamp: DateTime<Utc>,
    pub base_path: String,
    pub files_scanned: usize,
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub issues: Vec<LintIssue>,
    pub summary: LintSummary,
}

impl LintReport {
    fn from_issues(base_path: &Path, files_scanned: usize, issues: Vec<LintIssue>) -> Self {
        let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
        let errors = count(Severity::Error);
        let warnings = count(Severity::Warning);
        let info = count(Severity::Info);

        let mut check_counts = BTreeMap::new();
        for issue in &issues {
            *check_counts.entry(issue.category).or_insert(0) += 1;
        }

        Self {
            timestamp: Utc::now(),
            base_path: base_path.display().to_string(),
            files_scanned,
            total_issues: issues.len(),
            errors,
            warnings,
            info,
            summary: LintSummary {
                passed: errors == 0,
                score: score(errors, warnings),
                check_counts,
            },
            issues,
        }
    }

    pub fn passed(&self) -> bool {
        self.summary.passed
    }
}

/// `max(0, 100 - 10 per error - 2 per warning)`
pub fn score(errors: usize, warnings: usize) -> u32 {
    let penalty = errors.saturating_mul(10).saturating_add(warnings.saturating_mul(2));
    100usize.saturating_sub(penalty) as u32
}

struct Page {
    path: PathBuf,
    rel: String,
    content: String,
}

struct Patterns {
    href: Regex,
    img: Regex,
    src: Regex,
    marker: Regex,
    script: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            href: Regex::new(r#"href\s*=\s*["']([^"']+)["']"#)?,
            img: Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"']+)["']"#)?,
            src: Regex::new(r#"(?i)\b(?:src|href)\s*=\s*["']([^"']+)["']"#)?,
            marker: Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b\s*[:\-]?\s*(.*)")?,
            script: Regex::new(r"(?is)<script([^>]*)>(.*?)</script>")?,
        })
    }
}

pub struct SiteLinter {
    root: PathBuf,
    patterns: Patterns,
}

impl SiteLinter {
    /// Fails if `root` does not exist
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            root: std::fs::canonicalize(root)?,
            patterns: Patterns::new()?,
        })
    }

    pub fn run(&self) -> Result<LintReport> {
        let (pages, images, mut issues) = self.discover()?;
        info!(
            "Linting {} page(s) and {} image(s) under {}",
            pages.len(),
            images.len(),
            self.root.display()
        );

        for page in &pages {
            self.check_links(page, &mut issues);
            self.check_images(page, &mut issues);
            self.check_markers(page, &mut issues);
            check_content(page, &mut issues);
            check_structure(page, &mut issues);
            self.check_scripts(page, &mut issues);
        }
        self.check_orphans(&pages, &images, &mut issues);

        let report = LintReport::from_issues(&self.root, pages.len(), issues);
        info!(
            "Lint finished: {} error(s), {} warning(s), score {}/100",
            report.errors, report.warnings, report.summary.score
        );
        Ok(report)
    }

    fn discover(&self) -> Result<(Vec<Page>, Vec<String>, Vec<LintIssue>)> {
        let mut pages = Vec::new();
        let mut images = Vec::new();
        let mut issues = Vec::new();

        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = self.relative(path);
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if ext == "html" {
                match std::fs::read(path) {
                    Ok(bytes) => pages.push(Page {
                        path: path.to_path_buf(),
                        rel,
                        content: String::from_utf8_lossy(&bytes).into_owned(),
                    }),
                    Err(e) => {
                        warn!("Could not read {}: {}", path.display(), e);
                        issues.push(issue(
                            Severity::Warning,
                            IssueCategory::FileRead,
                            &rel,
                            format!("Could not read file: {}", e),
                        ));
                    }
                }
            } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                images.push(rel);
            }
        }

        pages.sort_by(|a, b| a.rel.cmp(&b.rel));
        images.sort();
        Ok((pages, images, issues))
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Resolve a link target against the page that contains it
    fn resolve(&self, page: &Path, target: &str) -> PathBuf {
        let base = if target.starts_with('/') {
            self.root.clone()
        } else {
            page.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone())
        };
        normalize(&base.join(target.trim_start_matches('/')))
    }

    fn check_links(&self, page: &Page, issues: &mut Vec<LintIssue>) {
        for caps in self.patterns.href.captures_iter(&page.content) {
            let (Some(whole), Some(href)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let href = href.as_str();
            let line = line_of(&page.content, whole.start());

            if is_external(href) {
                continue;
            }

            if let Some(anchor) = href.strip_prefix('#') {
                if !anchor.is_empty() && !has_anchor(&page.content, anchor) {
                    issues.push(
                        issue(
                            Severity::Error,
                            IssueCategory::BrokenLink,
                            &page.rel,
                            format!("Broken anchor link: #{}", anchor),
                        )
                        .details(format!("Anchor '{}' not found in the page", anchor))
                        .at(line),
                    );
                }
                continue;
            }

            let target = strip_query(href);
            if target.is_empty() {
                continue;
            }
            let resolved = self.resolve(&page.path, target);
            if !link_target_exists(&resolved) {
                debug!("Broken link in {}: {}", page.rel, href);
                issues.push(
                    issue(
                        Severity::Error,
                        IssueCategory::BrokenLink,
                        &page.rel,
                        format!("Broken link: {}", href),
                    )
                    .details("Target file does not exist".to_string())
                    .at(line),
                );
            }
        }
    }

    fn check_images(&self, page: &Page, issues: &mut Vec<LintIssue>) {
        for caps in self.patterns.img.captures_iter(&page.content) {
            let (Some(whole), Some(src)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let src = src.as_str();
            if src.starts_with("data:") || is_external(src) {
                continue;
            }

            let line = line_of(&page.content, whole.start());
            let resolved = self.resolve(&page.path, strip_query(src));
            match std::fs::metadata(&resolved) {
                Ok(meta) if meta.is_file() && meta.len() == 0 => issues.push(
                    issue(
                        Severity::Error,
                        IssueCategory::MissingImage,
                        &page.rel,
                        format!("Empty image file: {}", src),
                    )
                    .details("Image file exists but is empty (0 bytes)".to_string())
                    .at(line),
                ),
                Ok(meta) if meta.is_file() => {}
                _ => issues.push(
                    issue(
                        Severity::Error,
                        IssueCategory::MissingImage,
                        &page.rel,
                        format!("Missing image: {}", src),
                    )
                    .details("Image file does not exist".to_string())
                    .at(line),
                ),
            }
        }
    }

    fn check_orphans(&self, pages: &[Page], images: &[String], issues: &mut Vec<LintIssue>) {
        let mut referenced = HashSet::new();
        for page in pages {
            for caps in self.patterns.src.captures_iter(&page.content) {
                let Some(src) = caps.get(1) else { continue };
                let src = src.as_str();
                if src.starts_with("data:") || is_external(src) {
                    continue;
                }
                let resolved = self.resolve(&page.path, strip_query(src));
                referenced.insert(self.relative(&resolved).to_lowercase());
            }
        }

        for image in images {
            if !referenced.contains(&image.to_lowercase()) {
                issues.push(
                    issue(
                        Severity::Info,
                        IssueCategory::OrphanedImage,
                        "global",
                        format!("Orphaned image: {}", image),
                    )
                    .details("Image file exists but is not referenced by any page".to_string()),
                );
            }
        }
    }

    fn check_markers(&self, page: &Page, issues: &mut Vec<LintIssue>) {
        for (i, text) in page.content.lines().enumerate() {
            let Some(caps) = self.patterns.marker.captures(text) else {
                continue;
            };
            let marker = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let rest: String = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();

            let mut found = issue(
                Severity::Warning,
                IssueCategory::TodoMarker,
                &page.rel,
                format!("Development marker found: {}", marker),
            )
            .at(i + 1);
            if !rest.is_empty() {
                found = found.details(rest);
            }
            issues.push(found);
        }
    }

    fn check_scripts(&self, page: &Page, issues: &mut Vec<LintIssue>) {
        for caps in self.patterns.script.captures_iter(&page.content) {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if attrs.to_lowercase().contains("src=") {
                continue;
            }
            let Some(body) = caps.get(2) else { continue };
            let line = line_of(&page.content, body.start());
            let script = body.as_str();

            for (open, close, what) in [('{', '}', "braces"), ('(', ')', "parentheses")] {
                let opened = script.matches(open).count();
                let closed = script.matches(close).count();
                if opened != closed {
                    issues.push(
                        issue(
                            Severity::Error,
                            IssueCategory::Javascript,
                            &page.rel,
                            format!("Possible unclosed {} in inline script", what),
                        )
                        .details(format!("{} '{}' vs {} '{}'", opened, open, closed, close))
                        .at(line),
                    );
                }
            }
        }
    }
}

fn check_content(page: &Page, issues: &mut Vec<LintIssue>) {
    let chars = page.content.trim().chars().count();
    if chars < MIN_CONTENT_CHARS {
        issues.push(
            issue(
                Severity::Warning,
                IssueCategory::EmptyFile,
                &page.rel,
                format!("File appears to have minimal content ({} chars)", chars),
            )
            .details("File may be incomplete or a placeholder".to_string()),
        );
    }
}

fn check_structure(page: &Page, issues: &mut Vec<LintIssue>) {
    let lower = page.content.to_lowercase();
    let checks = [
        ("<!doctype", Severity::Warning, "Missing DOCTYPE declaration"),
        ("<html", Severity::Error, "Missing <html> tag"),
        ("<head", Severity::Info, "Missing <head> section"),
        ("<body", Severity::Info, "Missing <body> section"),
    ];
    for (needle, severity, message) in checks {
        if !lower.contains(needle) {
            issues.push(issue(
                severity,
                IssueCategory::HtmlStructure,
                &page.rel,
                message.to_string(),
            ));
        }
    }
}

fn issue(severity: Severity, category: IssueCategory, file: &str, message: String) -> LintIssue {
    LintIssue {
        severity,
        category,
        file: file.to_string(),
        message,
        details: None,
        line: None,
    }
}

impl LintIssue {
    fn details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

fn is_external(href: &str) -> bool {
    let lower = href.to_lowercase();
    ["http://", "https://", "//", "mailto:", "tel:", "javascript:"]
        .iter()
        .any(|p| lower.starts_with(p))
}

fn strip_query(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

fn has_anchor(content: &str, anchor: &str) -> bool {
    let escaped = regex::escape(anchor);
    Regex::new(&format!(r#"(?i)\b(?:id|name)\s*=\s*["']{}["']"#, escaped))
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

fn link_target_exists(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    if path.is_dir() {
        return path.join("index.html").is_file();
    }
    path.extension().is_none() && path.with_extension("html").is_file()
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_patterns_compile() {
        assert!(Patterns::new().is_ok());
    }

    #[test_case(0, 0, 100 ; "clean")]
    #[test_case(1, 3, 84 ; "mixed")]
    #[test_case(12, 0, 0 ; "floored at zero")]
    fn test_score(errors: usize, warnings: usize, expected: u32) {
        assert_eq!(score(errors, warnings), expected);
    }

    #[test_case("https://github.com/x/y", true ; "https")]
    #[test_case("MAILTO:team@example.com", true ; "mailto uppercase")]
    #[test_case("tel:+15551234", true ; "tel")]
    #[test_case("javascript:void(0)", true ; "javascript")]
    #[test_case("/pricing.html", false ; "root relative")]
    #[test_case("docs/", false ; "relative dir")]
    fn test_external(href: &str, expected: bool) {
        assert_eq!(is_external(href), expected);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/site/blog/../img/./logo.png")),
            PathBuf::from("/site/img/logo.png")
        );
    }

    #[test]
    fn test_anchor_lookup() {
        let html = r#"<section id="pricing"></section><a name='faq'></a>"#;
        assert!(has_anchor(html, "pricing"));
        assert!(has_anchor(html, "faq"));
        assert!(!has_anchor(html, "team"));
    }
}
