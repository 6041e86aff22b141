//! Site configuration management.
//!
//! The whole configuration is built once at startup and then shared
//! read-only (usually behind an `Arc`) by the components that need it.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Public site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Headless content source (Directus) settings.
    pub content: ContentConfig,

    /// Identity collaborator settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Asset/image collaborator settings.
    #[serde(default)]
    pub image: ImageConfig,

    /// Web font selection.
    #[serde(default)]
    pub fonts: FontConfig,

    /// OG image defaults.
    #[serde(default)]
    pub og_image: OgImageConfig,

    /// Sitemap partitioning rules.
    #[serde(default)]
    pub sitemap: SitemapConfig,

    /// Color mode settings.
    #[serde(default)]
    pub color_mode: ColorModeConfig,

    /// Feature layers extended by this site (e.g. "portal", "proposals").
    #[serde(default)]
    pub layers: Vec<String>,
}

/// Public site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public URL of the site (e.g., "https://example.com").
    #[serde(default = "default_site_url")]
    pub url: String,

    /// Site name used in titles and structured data.
    #[serde(default = "default_site_name")]
    pub name: String,
}

/// Content source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Base URL of the Directus instance.
    pub url: String,

    /// Static access token sent as a bearer token, if any.
    #[serde(default)]
    pub token: Option<String>,

    /// Relation depth requested when fetching records.
    #[serde(default = "default_depth")]
    pub depth: u8,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on concurrent block fetches for one page.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// What a page does when a block fetch fails at the transport level.
    #[serde(default)]
    pub on_fetch_failure: FailurePolicy,
}

/// Page-level reaction to a transport failure while resolving blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole page so it can show a fallback.
    #[default]
    Fallback,
    /// Mark the failed block and render the rest.
    Partial,
}

/// Identity collaborator configuration. Consumed, not implemented, here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether authentication is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether every route requires a session.
    #[serde(default)]
    pub global_middleware: bool,

    /// User fields requested from the identity provider.
    #[serde(default = "default_user_fields")]
    pub user_fields: Vec<String>,

    /// Redirect targets.
    #[serde(default)]
    pub redirect: AuthRedirects,
}

/// Redirect paths used by the identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRedirects {
    /// Where to send users when login is required.
    #[serde(default = "default_login_path")]
    pub login: String,

    /// Where to send users after logout.
    #[serde(default = "default_logout_path")]
    pub logout: String,

    /// Where to send users after a successful login.
    #[serde(default = "default_home_path")]
    pub home: String,

    /// Password reset page.
    #[serde(default = "default_reset_password_path")]
    pub reset_password: String,

    /// Callback after login with an external provider.
    #[serde(default = "default_callback_path")]
    pub callback: String,
}

/// Asset service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Asset base URL. Defaults to `{content.url}/assets/`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Font selection handed to the font collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Family name to weights.
    #[serde(default)]
    pub families: BTreeMap<String, Vec<u16>>,

    /// CSS `font-display` strategy.
    #[serde(default)]
    pub display: FontDisplay,

    /// Whether fonts are self-hosted instead of linked.
    #[serde(default = "default_true")]
    pub download: bool,
}

/// CSS `font-display` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
    Auto,
    Block,
    #[default]
    Swap,
    Fallback,
    Optional,
}

/// OG image defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OgImageConfig {
    /// Template component name.
    #[serde(default = "default_og_component")]
    pub component: String,

    #[serde(default = "default_og_width")]
    pub width: u32,

    #[serde(default = "default_og_height")]
    pub height: u32,
}

/// Named sitemaps and the routes they cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitemapConfig {
    #[serde(default)]
    pub sitemaps: BTreeMap<String, SitemapRule>,
}

/// Include/exclude route patterns for one sitemap.
///
/// Patterns are route globs: `*` matches one path segment, a trailing `**`
/// matches the prefix and everything below it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitemapRule {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Color mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorModeConfig {
    /// Suffix appended to the color mode class on the root element.
    #[serde(default)]
    pub class_suffix: String,
}

// Default value functions
fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_name() -> String {
    "AgencyOS".to_string()
}

fn default_depth() -> u8 {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_user_fields() -> Vec<String> {
    vec!["*".to_string(), "contacts.*".to_string()]
}

fn default_login_path() -> String {
    "/auth/signin".to_string()
}

fn default_logout_path() -> String {
    "/".to_string()
}

fn default_home_path() -> String {
    "/portal".to_string()
}

fn default_reset_password_path() -> String {
    "/auth/reset-password".to_string()
}

fn default_callback_path() -> String {
    "/auth/callback".to_string()
}

fn default_og_component() -> String {
    "OgImageTemplate".to_string()
}

fn default_og_width() -> u32 {
    1200
}

fn default_og_height() -> u32 {
    630
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            name: default_site_name(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global_middleware: false,
            user_fields: default_user_fields(),
            redirect: AuthRedirects::default(),
        }
    }
}

impl Default for AuthRedirects {
    fn default() -> Self {
        Self {
            login: default_login_path(),
            logout: default_logout_path(),
            home: default_home_path(),
            reset_password: default_reset_password_path(),
            callback: default_callback_path(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            families: BTreeMap::new(),
            display: FontDisplay::default(),
            download: true,
        }
    }
}

impl Default for OgImageConfig {
    fn default() -> Self {
        Self {
            component: default_og_component(),
            width: default_og_width(),
            height: default_og_height(),
        }
    }
}

impl AuthRedirects {
    /// All redirect targets with their config key.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("login", &self.login),
            ("logout", &self.logout),
            ("home", &self.home),
            ("reset_password", &self.reset_password),
            ("callback", &self.callback),
        ]
    }
}

impl SitemapConfig {
    /// Names of the sitemaps a route belongs to.
    pub fn sitemaps_for(&self, route: &str) -> Vec<&str> {
        self.sitemaps
            .iter()
            .filter(|(_, rule)| rule.covers(route))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl SitemapRule {
    /// Whether this rule covers the route.
    ///
    /// An empty include list covers every route not excluded.
    pub fn covers(&self, route: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| route_matches(p, route));
        included && !self.exclude.iter().any(|p| route_matches(p, route))
    }
}

/// Match a route against a route glob.
pub fn route_matches(pattern: &str, route: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let route: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();

    let mut i = 0;
    for (idx, segment) in pattern.iter().enumerate() {
        if *segment == "**" {
            // Only meaningful as the last segment.
            return idx == pattern.len() - 1;
        }
        match route.get(i) {
            Some(part) if *segment == "*" || segment == part => i += 1,
            _ => return false,
        }
    }
    i == route.len()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            CoreError::Toml(e) => CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            ),
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `AGENCYOS__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("AGENCYOS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.site.name.is_empty() {
            return Err(CoreError::config("site.name cannot be empty"));
        }

        check_http_url("site.url", &self.site.url)?;
        check_http_url("content.url", &self.content.url)?;
        if let Some(base) = &self.image.base_url {
            check_http_url("image.base_url", base)?;
        }

        if self.content.depth == 0 {
            return Err(CoreError::config("content.depth must be at least 1"));
        }

        if self.content.max_concurrent_fetches == 0 {
            return Err(CoreError::config(
                "content.max_concurrent_fetches must be at least 1",
            ));
        }

        for (key, path) in self.auth.redirect.entries() {
            if !path.starts_with('/') {
                return Err(CoreError::config(format!(
                    "auth.redirect.{key} must be an absolute path, got '{path}'"
                )));
            }
        }

        if self.site.url.ends_with('/') {
            tracing::warn!("site.url should not have a trailing slash");
        }

        Ok(())
    }

    /// Get the full public URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Content source base URL without a trailing slash.
    pub fn content_url(&self) -> &str {
        self.content.url.trim_end_matches('/')
    }

    /// Asset base URL, always ending with a slash.
    pub fn image_base_url(&self) -> String {
        match &self.image.base_url {
            Some(base) if base.ends_with('/') => base.clone(),
            Some(base) => format!("{base}/"),
            None => format!("{}/assets/", self.content_url()),
        }
    }
}

fn check_http_url(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CoreError::config(format!("{key} cannot be empty")));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(CoreError::config(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(())
}
