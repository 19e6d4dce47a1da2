//! Composable installer scripts for the disk image.

use std::path::Path;

use crate::error::{ErrorExt, Result};
use crate::fsutil;
use crate::template::Template;

/// A shell script assembled from a template and nested child scripts.
///
/// Children render in insertion order and replace the parent's `{{script}}`
/// placeholder. Nesting is recursive; a child may carry children of its own.
pub struct OsxScript {
    template: Template,
    children: Vec<OsxScript>,
}

impl OsxScript {
    /// Loads the script template with the given registry id.
    pub fn new(id: &str) -> Result<Self> {
        Ok(OsxScript {
            template: Template::load(id)?,
            children: Vec::new(),
        })
    }

    /// Replaces a `{{name}}` placeholder in this script's own template.
    pub fn set_placeholder(&mut self, name: &str, content: Option<&str>) {
        self.template.set_placeholder(name, content);
    }

    /// Appends a child script to the `{{script}}` slot.
    pub fn add_child(&mut self, child: OsxScript) {
        self.children.push(child);
    }

    /// Renders the script with every child expanded.
    pub fn render(&self) -> String {
        let mut combined = String::new();
        for child in &self.children {
            combined.push_str(&child.render());
        }
        let mut template = self.template.clone();
        template.set_placeholder("script", Some(&combined));
        template.render()
    }

    /// Writes the rendered script, creating parent directories.
    ///
    /// Installer scripts run for whoever mounts the image, so the mode is
    /// always 755.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        tokio::fs::write(path, self.render())
            .await
            .fs_context("writing script", path)?;
        fsutil::set_unix_mode(path, 0o755).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_render_in_insertion_order() {
        let mut parent = OsxScript::new("osx/preinstall.sh").unwrap();
        for name in ["svc-a", "svc-b"] {
            let mut child = OsxScript::new("osx/uninstall-service.sh").unwrap();
            child.set_placeholder("serviceName", Some(name));
            parent.add_child(child);
        }

        let text = parent.render();
        assert!(!text.contains("{{script}}"));
        let a = text.find("Stopping service svc-a").unwrap();
        let b = text.find("Stopping service svc-b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn childless_script_renders_an_empty_slot() {
        let parent = OsxScript::new("osx/postinstall.sh").unwrap();
        let text = parent.render();
        assert!(text.starts_with("#!/bin/sh"));
        assert!(!text.contains("{{script}}"));
        assert!(text.trim_end().ends_with("exit 0"));
    }

    #[tokio::test]
    async fn written_script_is_executable_for_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripts/preinstall.sh");

        let parent = OsxScript::new("osx/preinstall.sh").unwrap();
        parent.write_to(&path).await.unwrap();

        assert!(path.is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o755);
        }
    }
}
