//! AgencyOS page rendering.
//!
//! # Modules
//!
//! - [`html`] - HTML documents from resolved pages
//! - [`assets`] - Asset service URLs for images
//! - [`template`] - Page shell templates with variable interpolation

pub mod assets;
pub mod html;
pub mod template;

pub use assets::{AssetUrls, Fit, Format, Transform};
pub use html::{PageRenderer, RenderError};
pub use template::{Template, TemplateContext, TemplateError, TemplateRegistry, escape_html};
