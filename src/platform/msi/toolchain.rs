//! WiX toolset discovery.
//!
//! The WiX tools (`candle.exe`, `light.exe`) install themselves under the
//! Program Files tree without registering on `PATH`, so the driver scans
//! the known layouts:
//!
//! 1. `<root>/wix toolset*/bin/<tool>` (the official installer)
//! 2. `<root>/WixEdit/wix*/<tool>` (the WixEdit bundle)
//!
//! falling back to the bare tool name, which lets a `PATH`-managed
//! installation work anyway. Search roots default to `ProgramFiles(x86)`
//! with `ProgramFiles` as fallback; tests inject fabricated roots.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Locator for the WiX tools.
#[derive(Clone, Debug)]
pub struct WixToolset {
    roots: Vec<PathBuf>,
}

impl WixToolset {
    /// Locates the toolset from the Program Files environment.
    ///
    /// Fails with [`Error::ToolchainNotFound`] when neither variable is
    /// set, which on any non-Windows host is the expected outcome.
    pub fn from_env() -> Result<Self> {
        let root = std::env::var_os("ProgramFiles(x86)")
            .or_else(|| std::env::var_os("ProgramFiles"))
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::ToolchainNotFound("environment ProgramFiles not found".into())
            })?;
        Ok(WixToolset { roots: vec![root] })
    }

    /// Creates a locator over explicit search roots.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        WixToolset { roots }
    }

    /// Resolves the invocation path of a WiX tool.
    ///
    /// Returns the bare tool name when no root contains a known layout.
    pub fn tool_path(&self, tool: &str) -> PathBuf {
        for root in &self.roots {
            let entries: Vec<String> = std::fs::read_dir(root)
                .into_iter()
                .flatten()
                .flatten()
                .filter_map(|e| e.file_name().into_string().ok())
                .collect();

            for program in &entries {
                if program.to_lowercase().starts_with("wix toolset") {
                    let candidate = root.join(program).join("bin").join(tool);
                    if candidate.exists() {
                        return candidate;
                    }
                }
            }

            for program in &entries {
                if program.eq_ignore_ascii_case("WixEdit") {
                    let wix_edit = root.join(program);
                    let subdirs = std::fs::read_dir(&wix_edit)
                        .into_iter()
                        .flatten()
                        .flatten()
                        .filter_map(|e| e.file_name().into_string().ok());
                    for sub in subdirs {
                        if sub.to_lowercase().starts_with("wix") {
                            let candidate = wix_edit.join(&sub).join(tool);
                            if candidate.exists() {
                                return candidate;
                            }
                        }
                    }
                }
            }
        }

        PathBuf::from(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_tool_under_official_layout() {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("WiX Toolset v3.11/bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("candle.exe"), "").unwrap();

        let toolset = WixToolset::with_roots(vec![root.path().to_path_buf()]);
        assert_eq!(toolset.tool_path("candle.exe"), bin.join("candle.exe"));
    }

    #[test]
    fn finds_tool_under_wixedit_layout() {
        let root = tempfile::tempdir().unwrap();
        let wix_dir = root.path().join("WixEdit/wix-3.0.5419");
        std::fs::create_dir_all(&wix_dir).unwrap();
        std::fs::write(wix_dir.join("light.exe"), "").unwrap();

        let toolset = WixToolset::with_roots(vec![root.path().to_path_buf()]);
        assert_eq!(toolset.tool_path("light.exe"), wix_dir.join("light.exe"));
    }

    #[test]
    fn falls_back_to_bare_name() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("Some Other Program")).unwrap();

        let toolset = WixToolset::with_roots(vec![root.path().to_path_buf()]);
        assert_eq!(toolset.tool_path("candle.exe"), PathBuf::from("candle.exe"));
    }

    #[test]
    fn missing_environment_is_toolchain_not_found() {
        // neither variable is set on the unix test hosts
        if std::env::var_os("ProgramFiles").is_none()
            && std::env::var_os("ProgramFiles(x86)").is_none()
        {
            let err = WixToolset::from_env().unwrap_err();
            assert!(matches!(err, Error::ToolchainNotFound(_)));
        }
    }
}
