//! Rendering membership results into markup
//!
//! Queries and rendering are separate steps: the aggregator returns a
//! [`MembersResult`] and the caller decides whether and how to render it.

use crate::config::Settings;
use crate::error::{GitHubMembersError, Result};
use crate::members::{MemberKind, MembersResult};
use std::path::Path;
use tera::{Context, Tera};

/// Turns a membership result into markup using a named template
pub trait RenderBridge {
    /// Render `template` with the context `{members: [...]}`
    fn render(&self, template: &str, result: &MembersResult) -> Result<String>;
}

/// Render bridge backed by Tera templates
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Load every template below `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let pattern = dir.join("**").join("*");
        let pattern = pattern.to_str().ok_or_else(|| {
            GitHubMembersError::Config(format!("Template path {:?} is not UTF-8", dir))
        })?;

        let tera = Tera::new(pattern)?;
        tracing::debug!(
            dir = %dir.display(),
            templates = tera.get_template_names().count(),
            "Loaded templates"
        );
        Ok(Self { tera })
    }

    /// Build from in-memory `(name, source)` pairs
    pub fn from_templates<'a>(
        templates: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;
        Ok(Self { tera })
    }
}

impl RenderBridge for TeraRenderer {
    fn render(&self, template: &str, result: &MembersResult) -> Result<String> {
        let context = Context::from_serialize(result)?;
        Ok(self.tera.render(template, &context)?)
    }
}

/// Render a listing with the template configured for its kind
pub fn render_members(
    renderer: &impl RenderBridge,
    settings: &Settings,
    kind: MemberKind,
    result: &MembersResult,
) -> Result<String> {
    renderer.render(settings.template_for(kind), result)
}
