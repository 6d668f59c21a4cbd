use anyhow::{Context, Result};
use clap::Parser;
use directlink_core::{MediaResolution, MediaResolver, RawPage, ResolverConfig};
use std::path::{Path, PathBuf};

/// Resolve the direct media URL behind a video page.
#[derive(Debug, Parser)]
#[command(name = "directlink")]
#[command(version, about = "Resolve the direct media URL behind a video page", long_about = None)]
pub struct Cli {
    /// Page URL to resolve (also the base URL when --page is given).
    pub url: String,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Netscape-format cookie file.
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Page fetch timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip confirmation requests for /get_file/ links.
    #[arg(long)]
    pub no_confirm: bool,

    /// Read the page body from FILE instead of fetching URL.
    #[arg(long, value_name = "FILE")]
    pub page: Option<PathBuf>,

    /// Pretty-print the JSON record.
    #[arg(long)]
    pub pretty: bool,

    /// Trace-level logging for the resolver.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds the resolver configuration: file first, then flags.
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ResolverConfig::default(),
        };

        if let Some(cookies) = &self.cookies {
            config.client.cookie_file = Some(cookies.clone());
        }
        if let Some(timeout) = self.timeout {
            config.client.timeout_secs = timeout;
        }
        if self.no_confirm {
            config.confirm_indirection = false;
        }

        Ok(config)
    }

    /// Resolves the page and returns the record to print.
    ///
    /// Errors are configuration or input problems; resolution failures
    /// are reported inside the record.
    pub async fn run(&self) -> Result<MediaResolution> {
        let config = self.resolver_config()?;
        tracing::debug!("loaded config: {:?}", config);

        let resolver = MediaResolver::with_config(config).context("failed to build resolver")?;

        match &self.page {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read page file {}", path.display()))?;
                let page = RawPage::new(self.url.clone(), text);
                Ok(resolver.resolve_page(&page).await.into())
            }
            None => Ok(resolver.resolve(&self.url).await),
        }
    }
}

/// Loads a resolver configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ResolverConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ResolverConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("directlink-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::try_parse_from(["directlink", "https://example.com/v/1"]).expect("args should parse");
        assert_eq!(cli.url, "https://example.com/v/1");
        assert!(!cli.no_confirm);
        assert!(cli.config.is_none());

        let config = cli.resolver_config().expect("default config");
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_missing_url_is_usage_error() {
        let err = Cli::try_parse_from(["directlink"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "directlink",
            "https://example.com/v/1",
            "--cookies",
            "/tmp/cookies.txt",
            "--timeout",
            "7",
            "--no-confirm",
        ])
        .expect("args should parse");

        let config = cli.resolver_config().expect("config");
        assert_eq!(config.client.cookie_file, Some(PathBuf::from("/tmp/cookies.txt")));
        assert_eq!(config.client.timeout_secs, 7);
        assert!(!config.confirm_indirection);
    }

    #[test]
    fn test_load_config_toml() {
        let path = temp_file(
            "config.toml",
            r#"
preferred_hosts = ["cdn.example.com"]
confirm_concurrency = 2

[client]
requests_per_second = 5.0
max_retries = 1
"#,
        );

        let config = load_config(&path).expect("config should load");
        std::fs::remove_file(&path).ok();

        assert_eq!(config.preferred_hosts, vec!["cdn.example.com".to_string()]);
        assert_eq!(config.confirm_concurrency, 2);
        assert_eq!(config.confirm_timeout_secs, 10);
        assert_eq!(config.client.requests_per_second, 5.0);
        assert_eq!(config.client.max_retries, 1);
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config(Path::new("/nonexistent/directlink.toml")).is_err());

        let path = temp_file("bad.toml", "confirm_concurrency = \"many\"");
        let result = load_config(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_offline_page() {
        let path = temp_file(
            "page.html",
            r#"<html><head><title>Offline</title></head>
               <video src="/media/clip_720p.mp4"></video></html>"#,
        );
        let cli = Cli::try_parse_from([
            "directlink",
            "https://example.com/watch/1",
            "--no-confirm",
            "--page",
            path.to_str().expect("utf-8 temp path"),
        ])
        .expect("args should parse");

        let record = cli.run().await.expect("run should succeed");
        std::fs::remove_file(&path).ok();

        assert_eq!(record.best_url.as_deref(), Some("https://example.com/media/clip_720p.mp4"));
        assert_eq!(record.title.as_deref(), Some("Offline"));
    }

    #[tokio::test]
    async fn test_run_missing_page_file() {
        let cli = Cli::try_parse_from([
            "directlink",
            "https://example.com/watch/1",
            "--page",
            "/nonexistent/page.html",
        ])
        .expect("args should parse");
        assert!(cli.run().await.is_err());
    }
}
