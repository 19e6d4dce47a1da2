//! Text templates for generated scripts and service definitions.
//!
//! Templates are compiled into the binary and addressed by their path below
//! `templates/`. Substitution is a plain text replacement of `{{name}}`
//! tokens: no escaping, no conditionals, no implicit handling of unknown
//! tokens. A token nobody replaced stays in the output verbatim, which makes
//! a forgotten placeholder visible in the generated file instead of silently
//! disappearing.

use std::path::Path;

use crate::error::{Error, ErrorExt, Result};
use crate::fsutil;

/// Compiled-in template registry.
const REGISTRY: &[(&str, &str)] = &[
    (
        "deb/init-service.sh",
        include_str!("../templates/deb/init-service.sh"),
    ),
    (
        "osx/preinstall.sh",
        include_str!("../templates/osx/preinstall.sh"),
    ),
    (
        "osx/postinstall.sh",
        include_str!("../templates/osx/postinstall.sh"),
    ),
    (
        "osx/install-service.sh",
        include_str!("../templates/osx/install-service.sh"),
    ),
    (
        "osx/uninstall-service.sh",
        include_str!("../templates/osx/uninstall-service.sh"),
    ),
    (
        "osx/launchd-service.plist",
        include_str!("../templates/osx/launchd-service.plist"),
    ),
];

/// A text template with `{{name}}` placeholders.
///
/// # Examples
///
/// ```no_run
/// use packsmith::template::Template;
///
/// # fn main() -> packsmith::error::Result<()> {
/// let mut init = Template::load("deb/init-service.sh")?;
/// init.set_placeholder("name", Some("ontime-srv"));
/// init.set_placeholder("description", None);
/// let text = init.render();
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Template {
    text: String,
}

impl Template {
    /// Loads a template from the compiled-in registry.
    pub fn load(id: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, text)| Template {
                text: (*text).to_string(),
            })
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
    }

    /// Replaces every occurrence of `{{name}}` with the given content.
    ///
    /// `None` removes the token. Replacement is by exact token, so setting a
    /// placeholder the template does not contain is a no-op.
    pub fn set_placeholder(&mut self, name: &str, content: Option<&str>) {
        let token = format!("{{{{{name}}}}}");
        self.text = self.text.replace(&token, content.unwrap_or_default());
    }

    /// Returns the current template text.
    pub fn render(&self) -> String {
        self.text.clone()
    }

    /// Writes the template text to `path`, creating parent directories.
    ///
    /// Sets mode 755 when `executable`, 644 otherwise.
    pub async fn write_to(&self, path: &Path, executable: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        tokio::fs::write(path, &self.text)
            .await
            .fs_context("writing template to", path)?;
        fsutil::set_unix_mode(path, if executable { 0o755 } else { 0o644 }).await
    }
}
