//! Lifecycle script composition.
//!
//! Installer features (services, license gate, deletion lists, run-after
//! hooks, user script text) each contribute small shell fragments to the
//! four package lifecycle scripts. The [`ScriptComposer`] collects those
//! fragments per [`Phase`] in two groups and renders the final scripts:
//!
//! ```text
//! #!/bin/sh
//! set -e
//!
//! <head fragments, insertion order>
//!
//! <tail fragments, insertion order>
//!
//! exit 0
//! ```
//!
//! Head fragments always render before every tail fragment, so a feature
//! that must run first (the license gate) stays first no matter when it
//! registered. Within a group, insertion order is preserved. Rendering is
//! byte-deterministic for identical call sequences; storage is a fixed
//! per-phase array, never an unordered collection.

use std::path::Path;

use crate::error::{ErrorExt, Result};
use crate::fsutil;

/// The four lifecycle phases of a package.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Before the payload is unpacked.
    PreInstall,
    /// After the payload is unpacked.
    PostInstall,
    /// Before the payload is removed.
    PreRemove,
    /// After the payload is removed.
    PostRemove,
}

impl Phase {
    /// All phases, in lifecycle order.
    pub const ALL: [Phase; 4] = [
        Phase::PreInstall,
        Phase::PostInstall,
        Phase::PreRemove,
        Phase::PostRemove,
    ];

    /// The Debian maintainer script name for this phase.
    pub fn file_name(self) -> &'static str {
        match self {
            Phase::PreInstall => "preinst",
            Phase::PostInstall => "postinst",
            Phase::PreRemove => "prerm",
            Phase::PostRemove => "postrm",
        }
    }

    fn index(self) -> usize {
        match self {
            Phase::PreInstall => 0,
            Phase::PostInstall => 1,
            Phase::PreRemove => 2,
            Phase::PostRemove => 3,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PhaseFragments {
    heads: Vec<String>,
    tails: Vec<String>,
}

/// Collects script fragments per phase and renders the lifecycle scripts.
#[derive(Clone, Debug, Default)]
pub struct ScriptComposer {
    phases: [PhaseFragments; 4],
}

impl ScriptComposer {
    /// Creates an empty composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment to the head group of a phase.
    ///
    /// Heads render before every tail fragment of the same phase.
    pub fn add_head(&mut self, phase: Phase, text: impl Into<String>) {
        self.phases[phase.index()].heads.push(text.into());
    }

    /// Appends a fragment to the tail group of a phase.
    pub fn add_tail(&mut self, phase: Phase, text: impl Into<String>) {
        self.phases[phase.index()].tails.push(text.into());
    }

    /// True when no fragment was registered for the phase.
    pub fn is_empty(&self, phase: Phase) -> bool {
        let fragments = &self.phases[phase.index()];
        fragments.heads.is_empty() && fragments.tails.is_empty()
    }

    /// Renders the script for one phase.
    ///
    /// Trailing newlines of each fragment are normalized so every fragment
    /// is newline-terminated exactly once and separated from its neighbors
    /// by one blank line.
    pub fn render(&self, phase: Phase) -> String {
        let fragments = &self.phases[phase.index()];
        let mut out = String::from("#!/bin/sh\nset -e\n");
        for fragment in fragments.heads.iter().chain(fragments.tails.iter()) {
            out.push('\n');
            out.push_str(fragment.trim_end_matches('\n'));
            out.push('\n');
        }
        out.push_str("\nexit 0\n");
        out
    }

    /// Renders all four phase scripts into `dir`, mode 755 each.
    ///
    /// Every script is written even when its phase collected no fragments;
    /// an empty phase renders to preamble and trailer only.
    pub async fn build(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .fs_context("creating scripts directory", dir)?;
        for phase in Phase::ALL {
            let path = dir.join(phase.file_name());
            tokio::fs::write(&path, self.render(phase))
                .await
                .fs_context("writing lifecycle script", &path)?;
            fsutil::set_unix_mode(&path, 0o755).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_phase_renders_preamble_and_trailer() {
        let composer = ScriptComposer::new();
        assert_eq!(
            composer.render(Phase::PreInstall),
            "#!/bin/sh\nset -e\n\nexit 0\n"
        );
    }

    #[test]
    fn heads_render_before_tails_regardless_of_insertion_order() {
        let mut composer = ScriptComposer::new();
        composer.add_tail(Phase::PreInstall, "echo tail-1");
        composer.add_head(Phase::PreInstall, "echo head-1");
        composer.add_tail(Phase::PreInstall, "echo tail-2");
        composer.add_head(Phase::PreInstall, "echo head-2");

        assert_eq!(
            composer.render(Phase::PreInstall),
            "#!/bin/sh\nset -e\n\
             \necho head-1\n\
             \necho head-2\n\
             \necho tail-1\n\
             \necho tail-2\n\
             \nexit 0\n"
        );
    }

    #[test]
    fn fragments_are_separated_by_blank_lines() {
        let mut composer = ScriptComposer::new();
        composer.add_tail(Phase::PostInstall, "echo one\n");
        composer.add_tail(Phase::PostInstall, "echo two\necho three");

        let script = composer.render(Phase::PostInstall);
        assert!(script.contains("\necho one\n\necho two\necho three\n"));
        assert!(!script.contains("\n\n\n"));
    }

    #[test]
    fn phases_are_independent() {
        let mut composer = ScriptComposer::new();
        composer.add_tail(Phase::PostRemove, "echo gone");

        assert!(composer.is_empty(Phase::PreInstall));
        assert!(!composer.is_empty(Phase::PostRemove));
        assert!(!composer.render(Phase::PreInstall).contains("echo gone"));
    }

    #[test]
    fn identical_call_sequences_render_identical_bytes() {
        let build = || {
            let mut c = ScriptComposer::new();
            c.add_head(Phase::PreInstall, "echo license gate");
            c.add_tail(Phase::PostInstall, "echo start service");
            c.add_tail(Phase::PostInstall, "rm -f \"/usr/share/app/cache\"");
            c
        };
        let a = build();
        let b = build();
        for phase in Phase::ALL {
            assert_eq!(a.render(phase), b.render(phase));
        }
    }

    #[tokio::test]
    async fn build_writes_all_four_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = ScriptComposer::new();
        composer.add_tail(Phase::PostInstall, "echo installed");

        composer.build(dir.path()).await.unwrap();

        for name in ["preinst", "postinst", "prerm", "postrm"] {
            let path = dir.path().join(name);
            assert!(path.exists(), "{name} missing");
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
                assert_eq!(mode, 0o755, "{name} mode");
            }
        }
        let postinst = std::fs::read_to_string(dir.path().join("postinst")).unwrap();
        assert!(postinst.contains("echo installed"));
    }
}
