use crate::bidding::model::Item;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Items whose title, description and category, joined by spaces, contain
/// `query` ignoring case.
/// A blank query lists everything except `me`'s own listings.
pub fn search_items<'a>(items: &'a [Item], query: &str, me: &str) -> Vec<&'a Item> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items.iter().filter(|i| !i.is_sold_by(me)).collect();
    }
    items
        .iter()
        .filter(|i| {
            format!("{} {} {}", i.title, i.description, i.category)
                .to_lowercase()
                .contains(&query)
        })
        .collect()
}

/// Home feed: other people's listings, narrowed to one category when one is picked.
pub fn filter_by_category<'a>(items: &'a [Item], category: Option<&str>, me: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|i| !i.is_sold_by(me))
        .filter(|i| category.map_or(true, |c| i.category.eq_ignore_ascii_case(c)))
        .collect()
}

/// Listings on `me`'s profile.
pub fn my_listings<'a>(items: &'a [Item], me: &str) -> Vec<&'a Item> {
    items.iter().filter(|i| i.is_sold_by(me)).collect()
}

/// Delays a search until typing pauses.
///
/// Every call supersedes the previous ones; only the latest query comes back
/// out of [`SearchDebouncer::debounce`], the others resolve to `None`.
#[derive(Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn debounce(&self, query: impl Into<String>) -> Option<String> {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.delay).await;
        (self.generation.load(Ordering::SeqCst) == generation).then_some(query)
    }
}
