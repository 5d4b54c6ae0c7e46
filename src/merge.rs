use std::collections::HashMap;

use tracing::info;

use crate::model::{AggregateResult, Article};

/// Fold a prior lost-friends snapshot into the current result. Articles
/// from `lost` are appended, then the combined set is deduplicated by
/// `link` keeping first-occurrence order. On a link collision the later
/// entry wins, so the snapshot's version of an article replaces the
/// freshly fetched one. `lost` itself is returned unchanged.
pub fn merge(
    result: AggregateResult,
    lost: AggregateResult,
) -> (AggregateResult, AggregateResult) {
    let AggregateResult {
        mut statistical_data,
        article_data,
    } = result;

    let before = article_data.len();
    let extra = lost.article_data.len();

    let mut combined = article_data;
    combined.extend(lost.article_data.iter().cloned());
    let article_data = dedup_by_link(combined);

    info!(
        before,
        extra,
        merged = article_data.len(),
        "merged prior snapshot into result"
    );

    statistical_data.article_num = article_data.len();
    (
        AggregateResult {
            statistical_data,
            article_data,
        },
        lost,
    )
}

/// Unique-by-link with last-write-wins, preserving the position of the
/// first occurrence of each link.
fn dedup_by_link(articles: Vec<Article>) -> Vec<Article> {
    let mut order: Vec<String> = Vec::new();
    let mut by_link: HashMap<String, Article> = HashMap::with_capacity(articles.len());

    for article in articles {
        if !by_link.contains_key(&article.link) {
            order.push(article.link.clone());
        }
        by_link.insert(article.link.clone(), article);
    }

    order
        .into_iter()
        .filter_map(|link| by_link.remove(&link))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatisticalData;

    fn article(link: &str, title: &str) -> Article {
        Article {
            title: title.to_string(),
            author: "someone".to_string(),
            avatar: String::new(),
            link: link.to_string(),
            published: "2024-01-01 00:00".to_string(),
            summary: "Unknown".to_string(),
            content: "Unknown".to_string(),
        }
    }

    fn dataset(articles: Vec<Article>) -> AggregateResult {
        AggregateResult {
            statistical_data: StatisticalData::default(),
            article_data: articles,
        }
    }

    #[test]
    fn snapshot_version_wins_on_link_collision() {
        let result = dataset(vec![article("https://x/a", "fresh title")]);
        let lost = dataset(vec![article("https://x/a", "snapshot title")]);

        let (merged, returned_lost) = merge(result, lost);

        assert_eq!(merged.article_data.len(), 1);
        // last write wins: the lost-set copy replaces the fresh one
        assert_eq!(merged.article_data[0].title, "snapshot title");
        assert_eq!(returned_lost.article_data.len(), 1);
        assert_eq!(returned_lost.article_data[0].title, "snapshot title");
    }

    #[test]
    fn disjoint_links_concatenate_in_order() {
        let result = dataset(vec![article("https://x/a", "a"), article("https://x/b", "b")]);
        let lost = dataset(vec![article("https://x/c", "c")]);

        let (merged, _) = merge(result, lost);

        let links: Vec<&str> = merged
            .article_data
            .iter()
            .map(|a| a.link.as_str())
            .collect();
        assert_eq!(links, ["https://x/a", "https://x/b", "https://x/c"]);
        assert_eq!(merged.statistical_data.article_num, 3);
    }

    #[test]
    fn merge_is_idempotent_on_links() {
        let result = dataset(vec![article("https://x/a", "a")]);
        let lost = dataset(vec![article("https://x/a", "a"), article("https://x/b", "b")]);

        let (merged, lost) = merge(result, lost);
        let first_links: Vec<String> =
            merged.article_data.iter().map(|a| a.link.clone()).collect();

        let (merged_again, _) = merge(merged, lost);
        let second_links: Vec<String> = merged_again
            .article_data
            .iter()
            .map(|a| a.link.clone())
            .collect();

        assert_eq!(first_links, second_links);
    }

    #[test]
    fn duplicate_keeps_first_position() {
        let result = dataset(vec![
            article("https://x/a", "a"),
            article("https://x/b", "b"),
        ]);
        let lost = dataset(vec![article("https://x/a", "a-late")]);

        let (merged, _) = merge(result, lost);

        assert_eq!(merged.article_data[0].link, "https://x/a");
        assert_eq!(merged.article_data[0].title, "a-late");
        assert_eq!(merged.article_data[1].link, "https://x/b");
    }

    #[test]
    fn empty_snapshot_is_a_no_op_on_content() {
        let result = dataset(vec![article("https://x/a", "a")]);
        let (merged, lost) = merge(result, dataset(Vec::new()));
        assert_eq!(merged.article_data.len(), 1);
        assert!(lost.article_data.is_empty());
    }
}
