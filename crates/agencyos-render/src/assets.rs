//! Asset URL building.
//!
//! Images are served and transformed by the asset service; this module only
//! derives the URL for a file and an optional set of transform parameters.

use std::fmt;

use agencyos_core::{Config, File, Relation};

/// How the image fits the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Cover,
    Contain,
    Inside,
    Outside,
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Inside => "inside",
            Self::Outside => "outside",
        })
    }
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Auto,
    Jpg,
    Png,
    Webp,
    Avif,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
        })
    }
}

/// Transform parameters passed to the asset service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<Fit>,
    pub format: Option<Format>,
    /// 1 to 100.
    pub quality: Option<u8>,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the quality, clamped to 1..=100.
    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.clamp(1, 100));
        self
    }

    fn query(&self) -> String {
        let params: Vec<String> = [
            self.width.map(|v| format!("width={v}")),
            self.height.map(|v| format!("height={v}")),
            self.fit.map(|v| format!("fit={v}")),
            self.format.map(|v| format!("format={v}")),
            self.quality.map(|v| format!("quality={v}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        params.join("&")
    }
}

/// Builds asset URLs against the configured asset base.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    base: String,
}

impl AssetUrls {
    /// `base` should end with a slash; one is added if it does not.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.image_base_url())
    }

    /// URL of the asset with identifier `id`.
    pub fn url(&self, id: &str, transform: &Transform) -> String {
        let query = transform.query();
        if query.is_empty() {
            format!("{}{id}", self.base)
        } else {
            format!("{}{id}?{query}", self.base)
        }
    }

    /// URL of a file relation, whether expanded or not.
    ///
    /// `None` when an expanded file carries no identifier or the relation
    /// was unreadable.
    pub fn file_url(&self, file: &Relation<File>, transform: &Transform) -> Option<String> {
        match file {
            Relation::Unresolved(id) => Some(self.url(&id.to_string(), transform)),
            Relation::Resolved(file) => file.id.as_deref().map(|id| self.url(id, transform)),
            Relation::Invalid(_) => None,
        }
    }
}

/// Alternative text for an image, when the file was expanded.
pub fn alt_text(file: &Relation<File>) -> Option<&str> {
    let file = file.as_resolved()?;
    file.description.as_deref().or(file.title.as_deref())
}
