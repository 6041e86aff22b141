//! Resolve command - resolve one page and print it

use std::{path::Path, sync::Arc};

use agencyos_blocks::Resolver;
use agencyos_core::Config;
use agencyos_render::PageRenderer;
use color_eyre::eyre::{Result, WrapErr, bail};

use super::{content_source, load_config};

/// Output format for a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Resolved blocks as JSON
    Json,
    /// Rendered HTML document
    Html,
}

/// Run the resolve command.
pub async fn run(
    config_path: &Path,
    permalink: &str,
    format: OutputFormat,
    fixtures: Option<&Path>,
) -> Result<()> {
    tracing::info!(?config_path, permalink, ?format, "Resolving page");

    let config = Arc::new(load_config(config_path)?);
    let output = resolve_to_string(config, permalink, format, fixtures).await?;
    println!("{output}");
    Ok(())
}

/// Resolve a page and format it.
pub async fn resolve_to_string(
    config: Arc<Config>,
    permalink: &str,
    format: OutputFormat,
    fixtures: Option<&Path>,
) -> Result<String> {
    let source = content_source(&config, fixtures)?;
    let resolver = Resolver::from_config(source, &config.content);

    let Some(page) = resolver
        .load_page(permalink)
        .await
        .wrap_err_with(|| format!("Failed to resolve {permalink}"))?
    else {
        bail!("No page is published at {permalink}");
    };

    if page.unavailable_count() > 0 {
        tracing::warn!(
            permalink,
            unavailable = page.unavailable_count(),
            "page has blocks that could not be resolved"
        );
    }

    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&page).wrap_err("Failed to serialize page")
        }
        OutputFormat::Html => PageRenderer::new(config)
            .render_page(&page)
            .wrap_err("Failed to render page"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fixture_site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::create_dir_all(dir.path().join("block_quote")).unwrap();
        fs::write(
            dir.path().join("pages/home.yaml"),
            "title: Home\npermalink: /\nblocks:\n  - collection: block_quote\n    item: 1\n  - collection: block_quote\n    item: 2\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("block_quote/1.json"),
            r#"{"id": "q1", "content": "Fixture quote"}"#,
        )
        .unwrap();
        dir
    }

    fn config() -> Arc<Config> {
        Arc::new(
            Config::parse(
                "[site]\nurl = \"https://a.example.com\"\nname = \"A\"\n[content]\nurl = \"https://cms.example.com\"\n",
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_resolve_json() {
        let site = fixture_site();
        let json = resolve_to_string(config(), "/", OutputFormat::Json, Some(site.path()))
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "Home");
        assert_eq!(value["blocks"][0]["status"], "ready");
        assert_eq!(value["blocks"][0]["collection"], "block_quote");
        assert_eq!(value["blocks"][0]["item"]["content"], "Fixture quote");
        assert_eq!(value["blocks"][1]["status"], "missing");
        assert_eq!(value["blocks"][1]["id"], 2);
    }

    #[tokio::test]
    async fn test_resolve_html() {
        let site = fixture_site();
        let html = resolve_to_string(config(), "/", OutputFormat::Html, Some(site.path()))
            .await
            .unwrap();
        assert!(html.contains("Fixture quote"));
        assert!(html.contains("<!-- block_quote:2 unavailable -->"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_permalink_fails() {
        let site = fixture_site();
        let err = resolve_to_string(config(), "/missing", OutputFormat::Json, Some(site.path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/missing"));
    }
}
