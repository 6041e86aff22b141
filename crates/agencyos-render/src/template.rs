//! Page shell templates.
//!
//! A small `{{ variable }}` interpolation engine. Blocks are rendered in
//! Rust; templates only provide the document around them.

use std::collections::HashMap;

use thiserror::Error;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Variables available to a template.
///
/// Values are inserted verbatim; use [`TemplateContext::with_text`] for
/// anything that did not come from this crate.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert markup as-is.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Add markup as-is.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add plain text, escaped for HTML.
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: &str) -> Self {
        self.insert(key, escape_html(value));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }
}

/// A named template.
///
/// `{{ name }}` is required, `{{ name? }}` renders empty when unset.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template with the given context.
    ///
    /// Substituted values are never scanned again, so a value containing
    /// `{{` is emitted literally.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut output = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| TemplateError::InvalidSyntax("unclosed {{ delimiter".to_string()))?;

            let var_name = after[..end].trim();
            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped, true),
                None => (var_name, false),
            };

            match context.get(var_name) {
                Some(value) => output.push_str(value),
                None if optional => {}
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            }
            rest = &after[end + 2..];
        }

        output.push_str(rest);
        Ok(output)
    }
}

/// Registry of templates, preloaded with the built-in page shells.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register(Template::new("base", DEFAULT_BASE_TEMPLATE));
        registry.register(Template::new("not_found", DEFAULT_NOT_FOUND_TEMPLATE));
        registry.register(Template::new("unavailable", DEFAULT_UNAVAILABLE_TEMPLATE));
        registry
    }

    /// Register a template, replacing any template with the same name.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Render a named template.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        self.get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?
            .render(context)
    }
}

/// Document shell around every page.
pub const DEFAULT_BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en" class="{{ color_mode_class }}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }} | {{ site_name }}</title>
    <link rel="canonical" href="{{ canonical_url }}">
    {{ font_links? }}
</head>
<body>
    <main class="page" data-permalink="{{ permalink }}">
{{ content }}
    </main>
    <footer class="site-footer">{{ site_name }}</footer>
</body>
</html>
"#;

/// Body of the page shown when no page matches a permalink.
pub const DEFAULT_NOT_FOUND_TEMPLATE: &str = r#"<section class="error-page">
    <h1>Page not found</h1>
    <p>Nothing is published at <code>{{ permalink }}</code>.</p>
    <a href="/">Back to the home page</a>
</section>"#;

/// Body of the page shown when the content source cannot be reached.
pub const DEFAULT_UNAVAILABLE_TEMPLATE: &str = r#"<section class="error-page">
    <h1>Temporarily unavailable</h1>
    <p>This page could not be loaded right now. Please try again shortly.</p>
</section>"#;
