use std::fmt;

use serde::{Deserialize, Serialize};

/// One roster row, wire format `[name, blog_url, avatar]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry(pub String, pub String, pub String);

/// The remotely hosted friend roster: `{"friends": [[name, blog_url, avatar], ...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub friends: Vec<RosterEntry>,
}

/// Which conventional feed path answered for a blog. `None` means every
/// candidate was exhausted and the friend is treated as unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Atom,
    Rss,
    Rss2,
    Rss3,
    Feed,
    Feed2,
    Feed3,
    Index,
    None,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Atom => "atom",
            FeedType::Rss => "rss",
            FeedType::Rss2 => "rss2",
            FeedType::Rss3 => "rss3",
            FeedType::Feed => "feed",
            FeedType::Feed2 => "feed2",
            FeedType::Feed3 => "feed3",
            FeedType::Index => "index",
            FeedType::None => "none",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized article record. `link` is the deduplication key across
/// merged datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub author: String,
    pub avatar: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub content: String,
}

/// Parser output for a single feed document. Blank metadata with no
/// articles is the degraded form returned on fetch or parse failure.
#[derive(Debug, Clone, Default)]
pub struct FeedResult {
    pub website_name: String,
    pub author: String,
    pub link: String,
    pub articles: Vec<Article>,
}

/// A friend's blog plus everything discovered about it during one run.
/// Built whole once probing and parsing are done, never mutated after.
#[derive(Debug, Clone)]
pub struct Friend {
    pub name: String,
    pub blog_url: String,
    pub avatar: String,
    pub feed_url: Option<String>,
    pub feed_type: FeedType,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalData {
    pub friends_num: usize,
    pub active_num: usize,
    pub lost_num: usize,
    pub article_num: usize,
    pub last_updated_time: String,
}

/// Shape of both output files (`friend_data.json`, `lost_friends.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(default)]
    pub statistical_data: StatisticalData,
    #[serde(default)]
    pub article_data: Vec<Article>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_deserializes_tuple_rows() {
        let json = r#"{"friends": [["清羽飞扬", "https://blog.liushen.fun/", "https://blog.liushen.fun/avatar.png"]]}"#;
        let roster: Roster = serde_json::from_str(json).unwrap();
        assert_eq!(roster.friends.len(), 1);
        let RosterEntry(name, blog_url, avatar) = &roster.friends[0];
        assert_eq!(name, "清羽飞扬");
        assert_eq!(blog_url, "https://blog.liushen.fun/");
        assert_eq!(avatar, "https://blog.liushen.fun/avatar.png");
    }

    #[test]
    fn roster_tolerates_missing_friends_key() {
        let roster: Roster = serde_json::from_str("{}").unwrap();
        assert!(roster.friends.is_empty());
    }

    #[test]
    fn feed_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FeedType::Atom).unwrap(), "\"atom\"");
        assert_eq!(serde_json::to_string(&FeedType::None).unwrap(), "\"none\"");
        assert_eq!(FeedType::Rss2.to_string(), "rss2");
    }

    #[test]
    fn aggregate_result_defaults_missing_sections() {
        let result: AggregateResult = serde_json::from_str("{}").unwrap();
        assert!(result.article_data.is_empty());
        assert_eq!(result.statistical_data, StatisticalData::default());
    }
}
