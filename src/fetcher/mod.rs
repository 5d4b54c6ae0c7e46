use std::time::Duration;

use chrono::Utc;
use feed_rs::{model::Entry, parser};
use reqwest::{header, Client, StatusCode};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    config::{HttpConfig, SpiderConfig},
    error::SpiderResult,
    model::{
        AggregateResult, Article, FeedResult, FeedType, Friend, Roster, RosterEntry,
        StatisticalData,
    },
    util::{rewrite::replace_non_domain, timefmt},
};

/// Browser-like User-Agent sent with every request; some blogs reject
/// obvious bot agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows; U; Windows NT 6.1; en-us) AppleWebKit/534.50 (KHTML, like Gecko) Version/5.1 Safari/534.50";

/// Conventional feed locations, probed in this exact order. The first
/// candidate answering 200 wins.
pub const FEED_PATHS: &[(FeedType, &str)] = &[
    (FeedType::Atom, "/atom.xml"),
    (FeedType::Rss, "/rss.xml"),
    (FeedType::Rss2, "/rss2.xml"),
    (FeedType::Rss3, "/rss.php"),
    (FeedType::Feed, "/feed"),
    (FeedType::Feed2, "/feed.xml"),
    (FeedType::Feed3, "/feed/"),
    (FeedType::Index, "/index.xml"),
];

/// Drives the whole roster: probe each friend's blog for a feed, fetch and
/// normalize its entries, and fold everything into the two output datasets.
pub struct Spider {
    client: Client,
    spider: SpiderConfig,
    concurrency: usize,
}

impl Spider {
    pub fn new(spider: SpiderConfig, http: &HttpConfig) -> SpiderResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs.max(1)))
            .timeout(Duration::from_secs(http.read_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            spider,
            concurrency: http.concurrency.max(1),
        })
    }

    /// Fetch every friend's articles. Returns `(result, lost)`: the
    /// aggregated article dataset in roster order, and a parallel dataset
    /// accounting for friends with no reachable feed. Every failure short
    /// of a panic degrades per friend; this never errors.
    pub async fn fetch_friend_data(&self) -> (AggregateResult, AggregateResult) {
        let roster = self.load_roster().await;
        let total = roster.friends.len();
        info!(total, "roster loaded, fetching friend feeds");

        let friends = self.fetch_all(roster.friends).await;

        let mut article_data = Vec::new();
        let mut active_num = 0;
        let mut lost_num = 0;
        for friend in &friends {
            if friend.feed_type == FeedType::None {
                lost_num += 1;
                continue;
            }
            if !friend.articles.is_empty() {
                active_num += 1;
            }
            article_data.extend(friend.articles.iter().cloned());
        }

        let now = timefmt::now_display();
        let result = AggregateResult {
            statistical_data: StatisticalData {
                friends_num: total,
                active_num,
                lost_num,
                article_num: article_data.len(),
                last_updated_time: now.clone(),
            },
            article_data,
        };
        let lost = AggregateResult {
            statistical_data: StatisticalData {
                friends_num: lost_num,
                active_num: 0,
                lost_num,
                article_num: 0,
                last_updated_time: now,
            },
            article_data: Vec::new(),
        };

        info!(
            friends = result.statistical_data.friends_num,
            active = result.statistical_data.active_num,
            lost = result.statistical_data.lost_num,
            articles = result.statistical_data.article_num,
            "friend fetch finished"
        );

        (result, lost)
    }

    /// Try the candidate feed paths against a blog homepage. Exhaustion is
    /// not an error: the caller gets `(FeedType::None, blog_url)` back.
    pub async fn probe_feed(&self, blog_url: &str) -> (FeedType, String) {
        probe_feed(&self.client, blog_url).await
    }

    /// Fetch and parse one feed document. Degrades to an empty
    /// `FeedResult` on any network or parse failure.
    pub async fn parse_feed(&self, feed_url: &str, blog_url: &str) -> FeedResult {
        parse_feed(&self.client, feed_url, blog_url).await
    }

    /// Download a previously persisted `AggregateResult` snapshot, used by
    /// merge mode against `merge_json_url`.
    pub async fn fetch_snapshot(&self, url: &str) -> SpiderResult<AggregateResult> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn load_roster(&self) -> Roster {
        let url = &self.spider.json_url;
        match self.try_load_roster(url).await {
            Ok(roster) => roster,
            Err(err) => {
                error!(error = %err, url = %url, "failed to load friend roster, continuing with none");
                Roster::default()
            }
        }
    }

    async fn try_load_roster(&self, url: &str) -> SpiderResult<Roster> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Process friends with bounded concurrency: spawn up to
    /// `concurrency` tasks, then re-sort by roster index so the output
    /// order never depends on completion order.
    async fn fetch_all(&self, roster: Vec<RosterEntry>) -> Vec<Friend> {
        let mut set = JoinSet::new();
        let mut done: Vec<(usize, Friend)> = Vec::with_capacity(roster.len());

        for (idx, entry) in roster.into_iter().enumerate() {
            let client = self.client.clone();
            let article_count = self.spider.article_count;
            set.spawn(async move { (idx, process_friend(client, entry, article_count).await) });

            if set.len() >= self.concurrency {
                if let Some(res) = set.join_next().await {
                    collect_task(res, &mut done);
                }
            }
        }

        while let Some(res) = set.join_next().await {
            collect_task(res, &mut done);
        }

        done.sort_by_key(|(idx, _)| *idx);
        done.into_iter().map(|(_, friend)| friend).collect()
    }
}

fn collect_task(
    res: Result<(usize, Friend), tokio::task::JoinError>,
    done: &mut Vec<(usize, Friend)>,
) {
    match res {
        Ok(pair) => done.push(pair),
        // A panicking friend task is dropped from the result, the run
        // carries on with the rest of the roster.
        Err(err) => error!(error = %err, "friend task failed"),
    }
}

async fn process_friend(client: Client, entry: RosterEntry, article_count: usize) -> Friend {
    let RosterEntry(name, blog_url, avatar) = entry;

    let (feed_type, feed_url) = probe_feed(&client, &blog_url).await;
    debug!(name = %name, blog = %blog_url, feed_type = %feed_type, feed_url = %feed_url, "feed probe finished");

    if feed_type == FeedType::None {
        warn!(name = %name, blog = %blog_url, "blog has no reachable feed");
        return Friend {
            name,
            blog_url,
            avatar,
            feed_url: None,
            feed_type,
            articles: Vec::new(),
        };
    }

    let feed = parse_feed(&client, &feed_url, &blog_url).await;
    let mut articles: Vec<Article> = feed
        .articles
        .into_iter()
        .map(|mut article| {
            article.author = name.clone();
            article.avatar = avatar.clone();
            article
        })
        .collect();
    if article_count > 0 {
        articles.truncate(article_count);
    }

    info!(name = %name, count = articles.len(), "fetched friend articles");
    Friend {
        name,
        blog_url,
        avatar,
        feed_url: Some(feed_url),
        feed_type,
        articles,
    }
}

async fn probe_feed(client: &Client, blog_url: &str) -> (FeedType, String) {
    let base = blog_url.trim_end_matches('/');
    for (feed_type, path) in FEED_PATHS {
        let feed_url = format!("{base}{path}");
        match client.get(&feed_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!(url = %feed_url, feed_type = %feed_type, "feed candidate accepted");
                return (*feed_type, feed_url);
            }
            Ok(response) => {
                debug!(url = %feed_url, status = response.status().as_u16(), "feed candidate rejected");
            }
            Err(err) => {
                debug!(url = %feed_url, error = %err, "feed candidate unreachable");
            }
        }
    }

    warn!(url = %blog_url, "no feed address found");
    (FeedType::None, blog_url.to_string())
}

async fn parse_feed(client: &Client, feed_url: &str, blog_url: &str) -> FeedResult {
    match try_parse_feed(client, feed_url, blog_url).await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, url = %feed_url, "failed to fetch or parse feed");
            FeedResult::default()
        }
    }
}

async fn try_parse_feed(
    client: &Client,
    feed_url: &str,
    blog_url: &str,
) -> SpiderResult<FeedResult> {
    let response = client.get(feed_url).send().await?.error_for_status()?;
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?;

    let text = decode_body(&bytes, content_type.as_deref());
    let feed = parser::parse(text.as_bytes())?;

    let website_name = feed
        .title
        .map(|title| title.content)
        .unwrap_or_else(|| "Unknown".to_string());
    let author = feed
        .authors
        .first()
        .map(|person| person.name.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let link = feed
        .links
        .first()
        .map(|link| link.href.clone())
        .unwrap_or_else(|| feed_url.to_string());

    let articles = feed
        .entries
        .iter()
        .map(|entry| convert_entry(entry, &author, blog_url))
        .collect();

    Ok(FeedResult {
        website_name,
        author,
        link,
        articles,
    })
}

fn convert_entry(entry: &Entry, author: &str, blog_url: &str) -> Article {
    let title = entry
        .title
        .as_ref()
        .map(|title| title.content.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let published = match (&entry.published, &entry.updated) {
        (Some(dt), _) => timefmt::format_fixed(dt.with_timezone(&Utc)),
        (None, Some(dt)) => {
            warn!(title = %title, "entry has no published time, falling back to updated");
            timefmt::format_fixed(dt.with_timezone(&Utc))
        }
        (None, None) => {
            warn!(title = %title, "entry has no timestamp");
            "Unknown".to_string()
        }
    };

    let link = entry
        .links
        .first()
        .map(|link| replace_non_domain(&link.href, blog_url))
        .unwrap_or_default();

    let summary = entry
        .summary
        .as_ref()
        .map(|summary| summary.content.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let content = entry
        .content
        .as_ref()
        .and_then(|content| content.body.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    Article {
        title,
        author: author.to_string(),
        avatar: String::new(),
        link,
        published,
        summary,
        content,
    }
}

/// Decode the response body with its declared charset when the
/// `Content-Type` header names one, otherwise sniff the encoding.
/// Feeds from older Chinese blogs are frequently GBK rather than UTF-8.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = ct.split(';').map(str::trim).find_map(|part| {
            part.get(..8)
                .filter(|prefix| prefix.eq_ignore_ascii_case("charset="))
                .map(|_| &part[8..])
        }) {
            let label = charset.trim_matches('"');
            if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
                let (text, _, _) = encoding.decode(bytes);
                return text.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
