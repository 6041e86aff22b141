//! HTML rendering of resolved pages.
//!
//! Text fields are escaped. `content` fields hold HTML written in the
//! editor of the content source and are emitted as-is.
//!
//! Blocks that could not be resolved leave an HTML comment in their place so
//! the page keeps its shape and the gap is visible in the source. Skipped
//! references leave nothing.

use std::sync::Arc;

use agencyos_blocks::{ResolvedBlock, ResolvedPage};
use agencyos_core::{
    Block, BlockColumn, BlockColumnRow, BlockCta, BlockHero, BlockQuote, BlockRichText, Config,
    File, Nested, Relation,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    assets::{AssetUrls, Fit, Format, Transform, alt_text},
    template::{TemplateContext, TemplateError, TemplateRegistry, escape_html},
};

/// HTML rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Result type for HTML rendering.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Renders resolved pages into complete HTML documents.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    templates: TemplateRegistry,
    assets: AssetUrls,
    config: Arc<Config>,
}

impl PageRenderer {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            templates: TemplateRegistry::new(),
            assets: AssetUrls::from_config(&config),
            config,
        }
    }

    /// Use a custom template registry.
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    /// Render a resolved page.
    pub fn render_page(&self, page: &ResolvedPage) -> Result<String> {
        let permalink = page.permalink.as_deref().unwrap_or("/");
        debug!(
            permalink,
            blocks = page.blocks.len(),
            unavailable = page.unavailable_count(),
            "rendering page"
        );

        let content = self.render_blocks(&page.blocks);
        let title = page.title.as_deref().unwrap_or(&self.config.site.name);
        self.render_shell(title, permalink, &content)
    }

    /// Page for a permalink with no published page.
    pub fn render_not_found(&self, permalink: &str) -> Result<String> {
        let ctx = TemplateContext::new().with_text("permalink", permalink);
        let body = self.templates.render("not_found", &ctx)?;
        self.render_shell("Page not found", permalink, &body)
    }

    /// Page shown when the content source could not be reached.
    pub fn render_unavailable(&self, permalink: &str) -> Result<String> {
        let body = self
            .templates
            .render("unavailable", &TemplateContext::new())?;
        self.render_shell("Temporarily unavailable", permalink, &body)
    }

    /// Render blocks in order, one fragment per line.
    pub fn render_blocks(&self, blocks: &[ResolvedBlock]) -> String {
        blocks
            .iter()
            .filter_map(|block| self.render_block(block))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render one block; `None` for skipped references.
    pub fn render_block(&self, block: &ResolvedBlock) -> Option<String> {
        match block {
            ResolvedBlock::Ready(block) => Some(self.render_ready(block)),
            ResolvedBlock::Pending { kind, id } => Some(comment(&format!("{kind}:{id} pending"))),
            ResolvedBlock::Missing { kind, id } | ResolvedBlock::Failed { kind, id, .. } => {
                Some(comment(&format!("{kind}:{id} unavailable")))
            }
            ResolvedBlock::Skipped { .. } => None,
        }
    }

    fn render_shell(&self, title: &str, permalink: &str, content: &str) -> Result<String> {
        let mut ctx = TemplateContext::new()
            .with_text("title", title)
            .with_text("site_name", &self.config.site.name)
            .with_text("canonical_url", &self.config.url_for(permalink))
            .with_text("permalink", permalink)
            .with_text(
                "color_mode_class",
                &format!("light{}", self.config.color_mode.class_suffix),
            )
            .with_var("content", content);

        if let Some(links) = self.font_links() {
            ctx.insert("font_links", links);
        }

        Ok(self.templates.render("base", &ctx)?)
    }

    fn font_links(&self) -> Option<String> {
        let fonts = &self.config.fonts;
        if fonts.families.is_empty() {
            return None;
        }

        let families = fonts
            .families
            .iter()
            .map(|(name, weights)| {
                let name = name.replace(' ', "+");
                if weights.is_empty() {
                    format!("family={name}")
                } else {
                    let weights = weights
                        .iter()
                        .map(u16::to_string)
                        .collect::<Vec<_>>()
                        .join(";");
                    format!("family={name}:wght@{weights}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        let display = font_display_name(fonts.display);

        Some(format!(
            r#"<link rel="stylesheet" href="{}">"#,
            escape_html(&format!(
                "https://fonts.googleapis.com/css2?{families}&display={display}"
            ))
        ))
    }

    fn render_ready(&self, block: &Block) -> String {
        let id_attr = block
            .id()
            .map(|id| format!(r#" data-block-id="{}""#, escape_html(&id.to_string())))
            .unwrap_or_default();
        let class = block.kind().collection().replace('_', "-");

        let inner = match block {
            Block::Hero(hero) => self.hero_html(hero),
            Block::RichText(text) => rich_text_html(text),
            Block::Columns(columns) => self.columns_html(columns),
            Block::Quote(quote) => quote_html(quote),
            Block::Cta(cta) => cta_html(cta),
        };

        format!(r#"<section class="block {class}"{id_attr}>{inner}</section>"#)
    }

    fn hero_html(&self, hero: &BlockHero) -> String {
        let mut html = String::new();
        html.push_str(&text_tag("p", "block-title", hero.title.as_deref()));
        html.push_str(&text_tag("h1", "block-headline", hero.headline.as_deref()));
        html.push_str(&raw_tag("div", "block-content", hero.content.as_deref()));
        if let Some(image) = &hero.image {
            let transform = Transform::new()
                .width(1600)
                .fit(Fit::Cover)
                .format(Format::Auto)
                .quality(80);
            html.push_str(&self.image_html(image, &transform));
        }
        html
    }

    fn columns_html(&self, columns: &BlockColumn) -> String {
        let mut html = String::new();
        html.push_str(&text_tag("p", "block-title", columns.title.as_deref()));
        html.push_str(&text_tag("h2", "block-headline", columns.headline.as_deref()));

        let rows = columns
            .children()
            .iter()
            .map(|row| match row {
                Relation::Resolved(row) => self.column_row_html(row),
                Relation::Unresolved(id) => comment(&format!(
                    "{}:{id} unavailable",
                    BlockColumn::CHILD_COLLECTION
                )),
                Relation::Invalid(_) => {
                    comment(&format!("{} invalid", BlockColumn::CHILD_COLLECTION))
                }
            })
            .collect::<Vec<_>>()
            .join("");
        html.push_str(&format!(r#"<div class="block-columns__rows">{rows}</div>"#));
        html
    }

    fn column_row_html(&self, row: &BlockColumnRow) -> String {
        let position = match row.image_position.as_deref() {
            Some("right") => "right",
            _ => "left",
        };

        let mut html = String::new();
        if let Some(image) = &row.image {
            let transform = Transform::new().width(800).fit(Fit::Cover).format(Format::Auto);
            html.push_str(&self.image_html(image, &transform));
        }
        html.push_str(&text_tag("p", "block-title", row.title.as_deref()));
        html.push_str(&text_tag("h3", "block-headline", row.headline.as_deref()));
        html.push_str(&raw_tag("div", "block-content", row.content.as_deref()));

        format!(r#"<div class="block-columns__row" data-image-position="{position}">{html}</div>"#)
    }

    fn image_html(&self, image: &Relation<File>, transform: &Transform) -> String {
        let Some(src) = self.assets.file_url(image, transform) else {
            return String::new();
        };
        let alt = alt_text(image).unwrap_or_default();
        let mut attrs = String::new();
        if let Some(file) = image.as_resolved() {
            if let (Some(width), Some(height)) = (file.width, file.height) {
                attrs = format!(r#" width="{width}" height="{height}""#);
            }
        }
        format!(
            r#"<img src="{}" alt="{}"{attrs} loading="lazy">"#,
            escape_html(&src),
            escape_html(alt)
        )
    }
}

fn rich_text_html(text: &BlockRichText) -> String {
    let alignment = match text.alignment.as_deref() {
        Some("center") => "center",
        _ => "left",
    };
    let mut html = String::new();
    html.push_str(&text_tag("p", "block-title", text.title.as_deref()));
    html.push_str(&text_tag("h2", "block-headline", text.headline.as_deref()));
    html.push_str(&raw_tag("div", "block-content", text.content.as_deref()));
    format!(r#"<div class="block-richtext__body" data-align="{alignment}">{html}</div>"#)
}

fn quote_html(quote: &BlockQuote) -> String {
    let mut html = String::from("<blockquote>");
    html.push_str(&raw_tag("div", "block-content", quote.content.as_deref()));
    if quote.title.is_some() || quote.subtitle.is_some() {
        html.push_str("<footer>");
        html.push_str(&text_tag("cite", "block-title", quote.title.as_deref()));
        html.push_str(&text_tag("span", "block-subtitle", quote.subtitle.as_deref()));
        html.push_str("</footer>");
    }
    html.push_str("</blockquote>");
    html
}

fn cta_html(cta: &BlockCta) -> String {
    let mut html = String::new();
    html.push_str(&text_tag("p", "block-title", cta.title.as_deref()));
    html.push_str(&text_tag("h2", "block-headline", cta.headline.as_deref()));
    html.push_str(&raw_tag("div", "block-content", cta.content.as_deref()));
    if let (Some(label), Some(href)) = (cta.button_label.as_deref(), cta.button_href.as_deref()) {
        html.push_str(&format!(
            r#"<a class="button" href="{}">{}</a>"#,
            escape_html(href),
            escape_html(label)
        ));
    }
    html
}

/// Element with escaped text, or nothing when the field is empty.
fn text_tag(tag: &str, class: &str, text: Option<&str>) -> String {
    match text.filter(|t| !t.is_empty()) {
        Some(text) => format!(r#"<{tag} class="{class}">{}</{tag}>"#, escape_html(text)),
        None => String::new(),
    }
}

/// Element with trusted markup, or nothing when the field is empty.
fn raw_tag(tag: &str, class: &str, markup: Option<&str>) -> String {
    match markup.filter(|m| !m.is_empty()) {
        Some(markup) => format!(r#"<{tag} class="{class}">{markup}</{tag}>"#),
        None => String::new(),
    }
}

/// HTML comment with `text` percent-escaped so it cannot close the comment
/// or open a new one: `<`, `>` and `%` are always escaped, and so is every
/// `-` that follows another `-`.
fn comment(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    let mut previous = None;
    for c in text.chars() {
        match c {
            '<' | '>' | '%' => escaped.push_str(&format!("%{:02X}", u32::from(c))),
            '-' if previous == Some('-') => escaped.push_str("%2D"),
            c => escaped.push(c),
        }
        previous = Some(c);
    }
    format!("<!-- {escaped} -->")
}

fn font_display_name(display: agencyos_core::config::FontDisplay) -> &'static str {
    use agencyos_core::config::FontDisplay;

    match display {
        FontDisplay::Auto => "auto",
        FontDisplay::Block => "block",
        FontDisplay::Swap => "swap",
        FontDisplay::Fallback => "fallback",
        FontDisplay::Optional => "optional",
    }
}
