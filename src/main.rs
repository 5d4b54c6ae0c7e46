use std::{path::Path, sync::OnceLock};

use anyhow::Context;
use tracing_subscriber::{
    filter::filter_fn, fmt::layer as fmt_layer, prelude::*, EnvFilter, Registry,
};

use friend_circle::{config::AppConfig, fetcher::Spider, merge, output};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    setup_tracing(&config)?;

    if !config.spider.enable {
        tracing::info!("spider disabled in configuration, nothing to do");
        return Ok(());
    }

    tracing::info!(url = %config.spider.json_url, "starting friend link crawl");
    let spider = Spider::new(config.spider.clone(), &config.http)
        .context("failed to build http client")?;

    let (mut result, lost) = spider.fetch_friend_data().await;

    if config.spider.merge_result.enable {
        let url = &config.spider.merge_result.merge_json_url;
        match spider.fetch_snapshot(url).await {
            Ok(snapshot) => {
                let (merged, _snapshot) = merge::merge(result, snapshot);
                result = merged;
            }
            Err(err) => {
                tracing::warn!(error = %err, url = %url, "could not load merge snapshot, skipping merge");
            }
        }
    }

    output::save_data_to_files(&result, &lost, Path::new("."))?;
    tracing::info!("friend link crawl finished");

    Ok(())
}

fn setup_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config
            .logging
            .level
            .clone()
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::new(level)
    });

    let log_path = Path::new(&config.logging.file);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = log_path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid log file path"))?;
    let directory = log_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| Path::new(".").to_path_buf());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let crate_filter = filter_fn(|meta| meta.target().starts_with("friend_circle"));
    let other_filter = filter_fn(|meta| !meta.target().starts_with("friend_circle"));

    let stdout_crate = fmt_layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_filter(crate_filter.clone());

    let stdout_general = fmt_layer()
        .with_writer(std::io::stdout)
        .with_filter(other_filter);

    let file_layer = fmt_layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(crate_filter);

    Registry::default()
        .with(env_filter)
        .with(stdout_crate)
        .with(stdout_general)
        .with(file_layer)
        .try_init()
        .context("failed to init tracing subscriber")?;

    Ok(())
}
