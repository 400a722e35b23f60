use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weibo_timeline::config::Config;
use weibo_timeline::download::{MediaDownloader, MediaKind};
use weibo_timeline::fetch::{BackoffPolicy, Fetcher};
use weibo_timeline::parse::TextNormalizer;
use weibo_timeline::sink::{user_dir, JsonLinesSink, TextSink};
use weibo_timeline::timeline::{Crawler, RunState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting weibo-timeline");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        user_id = config.user_id,
        order = ?config.order,
        only_original = config.only_original,
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    let normalizer = TextNormalizer::for_label(&config.output_charset)
        .context("Unknown output charset")?;

    let policy = BackoffPolicy {
        step: config.rate_limit_step,
        max_retries: config.rate_limit_max_retries,
    };
    let fetcher = Fetcher::new(&config.cookie, policy, config.request_timeout)
        .context("Failed to create HTTP client")?;

    let mut crawler = Crawler::new(config.clone(), fetcher)
        .context("Failed to create crawler")?
        .with_sink(Box::new(JsonLinesSink::new(&config.output_dir)))
        .with_sink(Box::new(TextSink::new(&config.output_dir, normalizer.encoding())));

    crawler.run().await.context("Crawl aborted")?;
    let state = crawler.into_state();

    log_summary(&config, &state);

    if config.pic_download || config.video_download {
        let downloader = MediaDownloader::new(config.request_timeout)?;
        let dir = user_dir(&config.output_dir, state.profile());
        if config.pic_download {
            downloader
                .download_all(state.posts(), MediaKind::Picture, &dir)
                .await
                .context("Picture download failed")?;
        }
        if config.video_download {
            downloader
                .download_all(state.posts(), MediaKind::Video, &dir)
                .await
                .context("Video download failed")?;
        }
    }

    info!("Done");
    Ok(())
}

fn log_summary(config: &Config, state: &RunState) {
    let profile = state.profile();
    info!(
        nickname = %profile.nickname,
        user_id = profile.user_id,
        posts = profile.post_count,
        following = profile.following,
        followers = profile.followers,
        "Profile"
    );
    let kind = if config.only_original {
        "original posts"
    } else {
        "posts"
    };
    info!(collected = state.len(), kind, "Crawl finished");

    match state.newest(config.order) {
        Some(post) => {
            let record = post.to_record();
            info!(
                overview = %record.overview,
                place = %record.publish_place,
                published = %record.publish_time,
                likes = record.up_num,
                reposts = record.retweet_num,
                comments = record.comment_num,
                tool = %record.publish_tool,
                "Newest post"
            );
        }
        None => warn!("No posts collected"),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,weibo_timeline=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
