//! HTML fragment rendering for the ticker strip

use crate::config::LoopStrategy;
use crate::repo::{format_stars, language_color, sort_by_trending, TrendingRepo};

/// `data-testid` of the outer ticker container
pub const CONTAINER_TEST_ID: &str = "trending-ticker";

/// `data-testid` of the scrolling content element
pub const CONTENT_TEST_ID: &str = "ticker-content";

/// `data-testid` of the fallback message
pub const UNAVAILABLE_TEST_ID: &str = "ticker-unavailable";

pub const UNAVAILABLE_MESSAGE: &str = "Trending repositories are temporarily unavailable.";

/// Render the scrolling content for a set of repos.
///
/// Repos are sorted by trending score first. Under `Wraparound` the card
/// sequence is emitted a second time, hidden from assistive technology.
pub fn render(repos: &[TrendingRepo], strategy: LoopStrategy) -> String {
    let mut sorted = repos.to_vec();
    sort_by_trending(&mut sorted);

    let cards: String = sorted.iter().map(render_card).collect();

    let mut html = String::new();
    html.push_str(&format!(
        r#"<div class="ticker-track" data-testid="{}">"#,
        CONTENT_TEST_ID
    ));
    html.push_str(&format!(r#"<div class="ticker-group">{}</div>"#, cards));
    if strategy == LoopStrategy::Wraparound {
        html.push_str(&format!(
            r#"<div class="ticker-group" aria-hidden="true">{}</div>"#,
            cards
        ));
    }
    html.push_str("</div>");
    html
}

/// Render a single repo card
pub fn render_card(repo: &TrendingRepo) -> String {
    format!(
        concat!(
            r#"<a class="ticker-card" href="{url}" target="_blank" rel="noopener noreferrer">"#,
            r#"<span class="ticker-name">{name}</span>"#,
            r#"<span class="ticker-stars">★ {stars}</span>"#,
            r#"<span class="ticker-lang" style="background-color:{color}">{language}</span>"#,
            "</a>"
        ),
        url = escape(&repo.url),
        name = escape(&repo.name),
        stars = format_stars(repo.stars_today),
        color = language_color(&repo.language),
        language = escape(&repo.language),
    )
}

/// Static message shown when the fixture cannot be loaded
pub fn render_unavailable() -> String {
    format!(
        r#"<div class="ticker-unavailable" data-testid="{}">{}</div>"#,
        UNAVAILABLE_TEST_ID, UNAVAILABLE_MESSAGE
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, stars: u64, language: &str, score: f64) -> TrendingRepo {
        TrendingRepo {
            name: name.to_string(),
            url: format!("https://github.com/{}", name),
            stars_today: stars,
            language: language.to_string(),
            trending_score: score,
        }
    }

    #[test]
    fn test_render_orders_cards_by_score() {
        let repos = vec![
            repo("low/one", 10, "Go", 1.0),
            repo("high/one", 2400, "Rust", 9.0),
        ];
        let html = render(&repos, LoopStrategy::Bounce);
        let high = html.find("high/one").unwrap();
        let low = html.find("low/one").unwrap();
        assert!(high < low);
        assert!(html.contains("★ 2.4k"));
        assert!(html.contains("★ 10<"));
        assert!(html.contains("background-color:#dea584"));
        assert!(html.contains(r#"data-testid="ticker-content""#));
    }

    #[test]
    fn test_bounce_renders_once_wraparound_twice() {
        let repos = vec![repo("a/b", 1, "Rust", 1.0)];
        assert_eq!(render(&repos, LoopStrategy::Bounce).matches("ticker-card").count(), 1);
        let wrapped = render(&repos, LoopStrategy::Wraparound);
        assert_eq!(wrapped.matches("ticker-card").count(), 2);
        assert!(wrapped.contains(r#"aria-hidden="true""#));
    }

    #[test]
    fn test_card_escapes_markup() {
        let mut r = repo("evil/<script>", 5, "Unknown\"Lang", 1.0);
        r.url = "https://x.test/?a=1&b=2".to_string();
        let card = render_card(&r);
        assert!(card.contains("evil/&lt;script&gt;"));
        assert!(card.contains("a=1&amp;b=2"));
        assert!(card.contains("Unknown&quot;Lang"));
        assert!(card.contains("background-color:#8b949e"));
        assert!(card.contains(r#"target="_blank""#));
    }

    #[test]
    fn test_unavailable_message() {
        let html = render_unavailable();
        assert!(html.contains(UNAVAILABLE_MESSAGE));
        assert!(html.contains(UNAVAILABLE_TEST_ID));
    }
}
