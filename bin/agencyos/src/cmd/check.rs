//! Check command - validate configuration and content fixtures

use std::{path::Path, sync::Arc};

use agencyos_blocks::{MemorySource, Resolver};
use agencyos_core::Config;
use color_eyre::eyre::{Result, bail};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates the configuration and, when a fixture directory is given,
/// resolves every fixture page against it.
pub async fn run(config_path: &Path, strict: bool, fixtures: Option<&Path>) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration");

    let result = validate(config_path, fixtures).await;

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Run every check and collect the findings.
pub async fn validate(config_path: &Path, fixtures: Option<&Path>) -> ValidationResult {
    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            c
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration invalid: {e}");
            return result;
        }
    };

    println!("\nChecking configuration values...");
    check_config_values(&config, &mut result);

    if let Some(dir) = fixtures {
        println!("\nChecking content fixtures...");
        check_fixtures(&config, dir, &mut result).await;
    }

    result
}

/// Warnings about settings that are valid but probably unintended.
pub fn check_config_values(config: &Config, result: &mut ValidationResult) {
    if config.content.token.is_none() {
        result.add_warning("content.token is not set; only public records will be visible");
    }

    if config.image.base_url.is_none() {
        result.add_warning(format!(
            "image.base_url is not set; using {}",
            config.image_base_url()
        ));
    }

    if config.auth.enabled && config.auth.user_fields.is_empty() {
        result.add_warning("auth.user_fields is empty; no user profile fields will be loaded");
    }

    if config.sitemap.sitemaps.is_empty() {
        result.add_warning("No sitemaps configured");
    }

    if config.content.depth > 5 {
        result.add_warning(format!(
            "content.depth = {} expands many relation levels on every request",
            config.content.depth
        ));
    }
}

async fn check_fixtures(config: &Config, dir: &Path, result: &mut ValidationResult) {
    let source = match MemorySource::from_dir(dir) {
        Ok(source) => source,
        Err(e) => {
            result.add_error(format!("Fixture error: {e}"));
            return;
        }
    };
    let permalinks: Vec<String> = source.permalinks().map(str::to_string).collect();
    if permalinks.is_empty() {
        result.add_warning(format!("No pages found in {}", dir.display()));
    }

    let resolver = Resolver::from_config(Arc::new(source), &config.content);
    for permalink in &permalinks {
        match resolver.load_page(permalink).await {
            Ok(Some(page)) => {
                let unavailable = page.unavailable_count();
                if unavailable > 0 {
                    result.add_warning(format!(
                        "{permalink}: {unavailable} of {} block(s) will not render",
                        page.blocks.len()
                    ));
                }
            }
            Ok(None) => result.add_error(format!("{permalink}: page could not be loaded")),
            Err(e) => result.add_error(format!("{permalink}: {e}")),
        }

        if !config.sitemap.sitemaps.is_empty() {
            let sitemaps = config.sitemap.sitemaps_for(permalink);
            match sitemaps.as_slice() {
                [] => result.add_warning(format!("{permalink}: not in any sitemap")),
                [name] => println!("  {permalink} → {name}"),
                names => result.add_warning(format!(
                    "{permalink}: listed in several sitemaps ({})",
                    names.join(", ")
                )),
            }
        }
    }
}
