use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use webmark_browser::BrowserSession;
use webmark_core::Config;
use webmark_llm::{MarkdownConverter, OpenAiConverter};

mod output;

#[derive(Parser, Debug)]
#[command(
    name = "webmark",
    about = "Fetch a web page with a stealth browser and convert it to Markdown",
    version
)]
struct Cli {
    /// Page to fetch (HTTP/HTTPS URL)
    url: String,

    /// Generation model (overrides the configured default)
    model: Option<String>,

    /// Config file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chrome/Chromium binary to use
    #[arg(long)]
    chrome: Option<String>,

    /// Milliseconds to wait for client-side rendering after navigation
    #[arg(long)]
    wait: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr; stdout carries the generated Markdown.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(model) = cli.model {
        config.convert.model = model;
    }
    if let Some(chrome) = cli.chrome {
        config.browser.chrome_path = Some(chrome);
    }
    if let Some(wait) = cli.wait {
        config.browser.render_wait_ms = wait;
    }

    let text = fetch_text(&cli.url, &config).await?;

    let converter = OpenAiConverter::from_env(&config.convert)?;
    let cwd = std::env::current_dir()?;
    let path = convert_and_write(&converter, &cli.url, &text, &config.convert, &cwd).await?;
    info!(path = %path.display(), "Done");

    Ok(())
}

/// Fetch stage. The browser session is torn down before this returns,
/// whether the fetch succeeded or not, so a later conversion failure
/// (including a missing API key) can never leak a browser process.
async fn fetch_text(url: &str, config: &Config) -> webmark_core::Result<String> {
    let session = BrowserSession::launch(&config.browser).await?;
    let fetched = session.fetch_text(url).await;
    session.close().await;
    fetched
}

/// Convert stage followed by the output stage. A conversion failure
/// aborts before any file is touched.
async fn convert_and_write(
    converter: &dyn MarkdownConverter,
    url: &str,
    text: &str,
    config: &webmark_core::ConvertConfig,
    dir: &std::path::Path,
) -> webmark_core::Result<std::path::PathBuf> {
    let markdown = converter.convert(text, config).await?;
    output::write_markdown(dir, url, &markdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use webmark_core::{ConvertConfig, WebmarkError};

    struct FixedConverter(&'static str);

    #[async_trait::async_trait]
    impl MarkdownConverter for FixedConverter {
        async fn convert(&self, _text: &str, _config: &ConvertConfig) -> webmark_core::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingConverter;

    #[async_trait::async_trait]
    impl MarkdownConverter for FailingConverter {
        async fn convert(&self, _text: &str, _config: &ConvertConfig) -> webmark_core::Result<String> {
            Err(WebmarkError::RateLimitOrQuota("(429): quota exhausted".into()))
        }
    }

    #[tokio::test]
    async fn test_convert_and_write_persists_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConvertConfig::default();

        let path = convert_and_write(
            &FixedConverter("# Title"),
            "https://example.com/docs",
            "page text",
            &config,
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title");
    }

    #[tokio::test]
    async fn test_conversion_failure_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConvertConfig::default();

        let err = convert_and_write(
            &FailingConverter,
            "https://example.com/docs",
            "page text",
            &config,
            dir.path(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WebmarkError::RateLimitOrQuota(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cli_requires_url() {
        let err = Cli::try_parse_from(["webmark"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_optional_model() {
        let cli = Cli::try_parse_from(["webmark", "https://example.com"]).unwrap();
        assert_eq!(cli.url, "https://example.com");
        assert!(cli.model.is_none());

        let cli = Cli::try_parse_from(["webmark", "https://example.com", "gpt-4o"]).unwrap();
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "webmark",
            "https://example.com",
            "--chrome",
            "/usr/bin/chromium",
            "--wait",
            "500",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.chrome.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(cli.wait, Some(500));
        assert!(cli.verbose);
    }
}
