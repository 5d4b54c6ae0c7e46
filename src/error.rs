use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed parse failed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
}

pub type SpiderResult<T> = Result<T, SpiderError>;
