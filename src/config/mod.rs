//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::RenderProfile;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "agora";
const DEFAULT_CACHE_CAPACITY: u64 = 256;
const DEFAULT_FEED_TTL_SECS: u64 = 300;
const DEFAULT_INVALIDATE_PAGES: u32 = 5;
const MAX_INVALIDATE_PAGES: u32 = 100;
const DEFAULT_POSTS_PER_PAGE: u64 = 10;
const DEFAULT_COMMENTS_PER_PAGE: u64 = 20;
const DEFAULT_MAX_TITLE_LENGTH: u64 = 200;
const DEFAULT_MAX_POST_LENGTH: u64 = 50_000;
const DEFAULT_MAX_COMMENT_LENGTH: u64 = 1_000;

/// Command-line arguments for the agora binary.
#[derive(Debug, Parser)]
#[command(name = "agora", version, about = "Agora content pipeline tools")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "AGORA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a Markdown document to sanitized HTML.
    Render(RenderArgs),
    /// Build a feed page from a directory of Markdown posts.
    Feed(FeedArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    Post,
    Comment,
}

impl From<ProfileArg> for RenderProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Post => RenderProfile::Post,
            ProfileArg::Comment => RenderProfile::Comment,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Allow-list applied to the rendered markup.
    #[arg(long, value_enum, default_value_t = ProfileArg::Post)]
    pub profile: ProfileArg,

    /// Emit the raw Markdown output without sanitisation or autolinking.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub unsanitized: bool,

    /// Markdown file to render; reads stdin when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FeedArgs {
    /// Directory of `*.md` files; each file becomes one published post.
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,

    /// Feed page to print (1-indexed).
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Toggle the feed cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the feed page lifetime.
    #[arg(long = "cache-feed-ttl-seconds", value_name = "SECONDS", global = true)]
    pub cache_feed_ttl_seconds: Option<u64>,

    /// Override the number of posts per feed page.
    #[arg(long = "feed-posts-per-page", value_name = "COUNT", global = true)]
    pub feed_posts_per_page: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub feed: FeedSettings,
    pub content: ContentSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: NonZeroUsize,
    pub feed_ttl: Duration,
    pub invalidate_pages: u32,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub posts_per_page: NonZeroU32,
    pub comments_per_page: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub max_title_length: NonZeroUsize,
    pub max_post_length: NonZeroUsize,
    pub max_comment_length: NonZeroUsize,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            max_title_length: NonZeroUsize::new(DEFAULT_MAX_TITLE_LENGTH as usize)
                .unwrap_or(NonZeroUsize::MIN),
            max_post_length: NonZeroUsize::new(DEFAULT_MAX_POST_LENGTH as usize)
                .unwrap_or(NonZeroUsize::MIN),
            max_comment_length: NonZeroUsize::new(DEFAULT_MAX_COMMENT_LENGTH as usize)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            posts_per_page: NonZeroU32::new(DEFAULT_POSTS_PER_PAGE as u32)
                .unwrap_or(NonZeroU32::MIN),
            comments_per_page: NonZeroU32::new(DEFAULT_COMMENTS_PER_PAGE as u32)
                .unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("AGORA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    feed: RawFeedSettings,
    content: RawContentSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(seconds) = overrides.cache_feed_ttl_seconds {
            self.cache.feed_ttl_seconds = Some(seconds);
        }
        if let Some(count) = overrides.feed_posts_per_page {
            self.feed.posts_per_page = Some(count);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            feed,
            content,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let feed = build_feed_settings(feed)?;
        let content = build_content_settings(content)?;

        Ok(Self {
            logging,
            cache,
            feed,
            content,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;

    // A zero TTL would store nothing; use `enabled = false` instead.
    let ttl_secs = cache.feed_ttl_seconds.unwrap_or(DEFAULT_FEED_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.feed_ttl_seconds",
            "must be greater than zero",
        ));
    }

    // Every content write deletes this many keys.
    let invalidate_pages = cache.invalidate_pages.unwrap_or(DEFAULT_INVALIDATE_PAGES);
    if invalidate_pages > MAX_INVALIDATE_PAGES {
        return Err(LoadError::invalid(
            "cache.invalidate_pages",
            format!("must be at most {MAX_INVALIDATE_PAGES}"),
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        capacity,
        feed_ttl: Duration::from_secs(ttl_secs),
        invalidate_pages,
    })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let posts = feed.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE);
    let comments = feed.comments_per_page.unwrap_or(DEFAULT_COMMENTS_PER_PAGE);

    Ok(FeedSettings {
        posts_per_page: non_zero_u32(posts, "feed.posts_per_page")?,
        comments_per_page: non_zero_u32(comments, "feed.comments_per_page")?,
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let title = content.max_title_length.unwrap_or(DEFAULT_MAX_TITLE_LENGTH);
    let post = content.max_post_length.unwrap_or(DEFAULT_MAX_POST_LENGTH);
    let comment = content
        .max_comment_length
        .unwrap_or(DEFAULT_MAX_COMMENT_LENGTH);

    Ok(ContentSettings {
        max_title_length: non_zero_usize(title, "content.max_title_length")?,
        max_post_length: non_zero_usize(post, "content.max_post_length")?,
        max_comment_length: non_zero_usize(comment, "content.max_comment_length")?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    capacity: Option<u64>,
    feed_ttl_seconds: Option<u64>,
    invalidate_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    posts_per_page: Option<u64>,
    comments_per_page: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    max_title_length: Option<u64>,
    max_post_length: Option<u64>,
    max_comment_length: Option<u64>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
