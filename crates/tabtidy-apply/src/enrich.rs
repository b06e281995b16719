//! Enrichment seam. Page-content extraction lives outside this crate; the
//! planner only needs something that fills `context` and `context_data`.

use std::future::Future;

use tabtidy_core::TabRecord;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Fills enrichment fields in place. Implementations must leave every
/// other field untouched and must not fail: a tab they cannot classify
/// simply keeps `context == None`.
pub trait ContextEnricher: Send + Sync {
    fn enrich(&self, tabs: &mut [TabRecord]) -> impl Future<Output = ()> + Send;
}

impl<T: ContextEnricher + ?Sized> ContextEnricher for &T {
    fn enrich(&self, tabs: &mut [TabRecord]) -> impl Future<Output = ()> + Send {
        (**self).enrich(tabs)
    }
}

/// Leaves tabs as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl ContextEnricher for NoEnrichment {
    fn enrich(&self, _tabs: &mut [TabRecord]) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Offline URL classifier. First matching row wins.
const URL_CONTEXTS: &[(&str, &[&str])] = &[
    ("Development", &["github", "stackoverflow", "localhost", "jira", "gitlab"]),
    ("Work", &["linkedin", "slack", "zoom", "teams"]),
    ("Entertainment", &["netflix", "spotify", "hulu", "disney", "youtube"]),
    ("Social", &["twitter", "facebook", "instagram", "reddit", "tiktok", "pinterest"]),
    ("Shopping", &["amazon", "ebay", "walmart", "target", "shopify"]),
    ("News", &["cnn", "bbc", "nytimes", "washingtonpost", "foxnews"]),
    ("Education", &["coursera", "udemy", "edx", "khanacademy", "canvas"]),
    ("Travel", &["expedia", "booking", "airbnb", "tripadvisor", "kayak"]),
    ("Health", &["webmd", "mayoclinic", "nih.gov", "health"]),
    ("Sports", &["espn", "nba", "nfl", "mlb", "fifa"]),
    ("Technology", &["techcrunch", "wired", "theverge", "arstechnica"]),
    ("Science", &["science", "nature.com", "nasa.gov"]),
    ("Gaming", &["twitch", "steam", "roblox", "ign", "gamespot"]),
    ("Music", &["soundcloud", "bandcamp", "last.fm"]),
    ("Art", &["deviantart", "behance", "dribbble", "artstation"]),
];

pub fn classify_url(url: &str) -> &'static str {
    let url = url.to_lowercase();
    let google_office = url.contains("google")
        && ["docs", "sheets", "slides"].iter().any(|n| url.contains(n));
    // Google office apps outrank the generic rows below Development.
    if google_office && !URL_CONTEXTS[0].1.iter().any(|n| url.contains(n)) {
        return "Work";
    }
    URL_CONTEXTS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| url.contains(n)))
        .map_or(UNCATEGORIZED, |(context, _)| context)
}

/// Sets `context` from the URL for tabs that have none yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEnricher;

impl ContextEnricher for HeuristicEnricher {
    fn enrich(&self, tabs: &mut [TabRecord]) -> impl Future<Output = ()> + Send {
        async move {
            let mut classified = 0usize;
            for tab in tabs.iter_mut() {
                if tab.context.as_deref().is_some_and(|c| !c.is_empty()) {
                    continue;
                }
                tab.context = Some(classify_url(&tab.url).to_string());
                classified += 1;
            }
            tracing::debug!(classified, "heuristic context applied");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_sites() {
        assert_eq!(classify_url("https://github.com/a/b"), "Development");
        assert_eq!(classify_url("https://docs.google.com/document/1"), "Work");
        assert_eq!(classify_url("https://www.YouTube.com/watch?v=1"), "Entertainment");
        assert_eq!(classify_url("https://example.org"), UNCATEGORIZED);
    }

    #[tokio::test]
    async fn keeps_existing_context() {
        let mut tabs = vec![
            TabRecord::new(1, 1, "a", "https://reddit.com"),
            TabRecord::new(2, 1, "b", "https://reddit.com"),
        ];
        tabs[1].context = Some("Research".into());
        HeuristicEnricher.enrich(&mut tabs).await;
        assert_eq!(tabs[0].context.as_deref(), Some("Social"));
        assert_eq!(tabs[1].context.as_deref(), Some("Research"));
    }

    #[tokio::test]
    async fn no_enrichment_is_inert() {
        let mut tabs = vec![TabRecord::new(1, 1, "a", "https://reddit.com")];
        NoEnrichment.enrich(&mut tabs).await;
        assert_eq!(tabs[0].context, None);
    }
}
