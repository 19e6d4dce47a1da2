//! WiX source (`.wxs`) generation.
//!
//! Emits a WiX v3 authoring of the staged payload: one component per file,
//! a start-menu shortcut per desktop starter, and product metadata from the
//! descriptor. All GUIDs are version-5 UUIDs derived from the package
//! identifier and the staged relative path, so regenerating the same
//! descriptor yields byte-identical authoring and stable component
//! identities across builds (which is what makes MSI upgrades work).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::descriptor::AppDescriptor;
use crate::error::{Error, ErrorExt, Result};

/// Generates the `.wxs` file for a staged payload and returns its path.
pub async fn generate(
    app: &AppDescriptor,
    staged_payload: &Path,
    wxs_path: &Path,
) -> Result<PathBuf> {
    let files = collect_files(staged_payload).await?;
    let xml = render(app, staged_payload, &files);

    if let Some(parent) = wxs_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating destination directory", parent)?;
    }
    tokio::fs::write(wxs_path, xml)
        .await
        .fs_context("writing wxs file", wxs_path)?;
    Ok(wxs_path.to_path_buf())
}

/// Relative paths of every staged file, sorted for deterministic output.
async fn collect_files(staged_payload: &Path) -> Result<Vec<PathBuf>> {
    let root = staged_payload.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.path().strip_prefix(&root)?.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    })
    .await
    .map_err(|e| Error::GenericError(format!("file listing task failed: {e}")))?
}

#[derive(Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: Vec<String>,
}

impl DirNode {
    fn insert(&mut self, rel: &Path) {
        let mut parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(file) = parts.pop() else { return };
        let mut node = self;
        for part in parts {
            node = node.dirs.entry(part).or_default();
        }
        node.files.push(file);
    }
}

fn render(app: &AppDescriptor, staged_payload: &Path, files: &[PathBuf]) -> String {
    let mut tree = DirNode::default();
    for file in files {
        tree.insert(file);
    }

    let display = xml_escape(&app.display_name);
    let manufacturer = xml_escape(if !app.vendor.is_empty() {
        &app.vendor
    } else if !app.maintainer.is_empty() {
        &app.maintainer
    } else {
        "Unknown"
    });
    let upgrade_code = guid(app, "upgrade-code");

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<Wix xmlns=\"http://schemas.microsoft.com/wix/2006/wi\">\n");
    let _ = writeln!(
        out,
        "  <Product Id=\"*\" Name=\"{display}\" Language=\"1033\" Version=\"{}\" Manufacturer=\"{manufacturer}\" UpgradeCode=\"{upgrade_code}\">",
        msi_version(&app.version)
    );
    let _ = writeln!(
        out,
        "    <Package Description=\"{}\" InstallerVersion=\"200\" Compressed=\"yes\" InstallScope=\"perMachine\"/>",
        xml_escape(app.short_description())
    );
    out.push_str("    <MajorUpgrade DowngradeErrorMessage=\"A newer version of [ProductName] is already installed.\"/>\n");
    out.push_str("    <Media Id=\"1\" Cabinet=\"media1.cab\" EmbedCab=\"yes\"/>\n");
    out.push_str("    <Directory Id=\"TARGETDIR\" Name=\"SourceDir\">\n");
    out.push_str("      <Directory Id=\"ProgramFilesFolder\">\n");
    let _ = writeln!(out, "        <Directory Id=\"INSTALLDIR\" Name=\"{display}\">");

    let mut component_refs = Vec::new();
    render_dir(
        app,
        &mut out,
        &tree,
        staged_payload,
        Path::new(""),
        10,
        &mut component_refs,
    );

    out.push_str("        </Directory>\n");
    out.push_str("      </Directory>\n");

    if !app.starters.is_empty() {
        render_shortcuts(app, &mut out, &mut component_refs);
    }

    out.push_str("    </Directory>\n");
    let _ = writeln!(
        out,
        "    <Feature Id=\"MainFeature\" Title=\"{display}\" Level=\"1\">"
    );
    for reference in &component_refs {
        let _ = writeln!(out, "      <ComponentRef Id=\"{reference}\"/>");
    }
    out.push_str("    </Feature>\n");
    out.push_str("  </Product>\n");
    out.push_str("</Wix>\n");
    out
}

fn render_dir(
    app: &AppDescriptor,
    out: &mut String,
    node: &DirNode,
    staged_payload: &Path,
    rel: &Path,
    indent: usize,
    component_refs: &mut Vec<String>,
) {
    let pad = " ".repeat(indent);

    for file in &node.files {
        let file_rel = rel.join(file);
        let key = file_rel.to_string_lossy();
        let component_id = format!("C{}", ident(app, &key));
        let file_id = format!("F{}", ident(app, &key));
        let source = staged_payload.join(&file_rel);

        let _ = writeln!(
            out,
            "{pad}<Component Id=\"{component_id}\" Guid=\"{}\">",
            guid(app, &key)
        );
        let _ = writeln!(
            out,
            "{pad}  <File Id=\"{file_id}\" Name=\"{}\" Source=\"{}\" KeyPath=\"yes\"/>",
            xml_escape(file),
            xml_escape(&source.display().to_string())
        );
        let _ = writeln!(out, "{pad}</Component>");
        component_refs.push(component_id);
    }

    for (name, child) in &node.dirs {
        let dir_rel = rel.join(name);
        let dir_id = format!("D{}", ident(app, &dir_rel.to_string_lossy()));
        let _ = writeln!(
            out,
            "{pad}<Directory Id=\"{dir_id}\" Name=\"{}\">",
            xml_escape(name)
        );
        render_dir(
            app,
            out,
            child,
            staged_payload,
            &dir_rel,
            indent + 2,
            component_refs,
        );
        let _ = writeln!(out, "{pad}</Directory>");
    }
}

fn render_shortcuts(app: &AppDescriptor, out: &mut String, component_refs: &mut Vec<String>) {
    out.push_str("      <Directory Id=\"ProgramMenuFolder\">\n");
    let _ = writeln!(
        out,
        "        <Directory Id=\"ApplicationProgramsFolder\" Name=\"{}\">",
        xml_escape(&app.display_name)
    );

    for (i, starter) in app.starters.iter().enumerate() {
        let key = format!("shortcut/{}", starter.executable);
        let component_id = format!("S{}", ident(app, &key));
        let target = starter.main_jar.replace('/', "\\");

        let _ = writeln!(
            out,
            "          <Component Id=\"{component_id}\" Guid=\"{}\">",
            guid(app, &key)
        );
        let _ = writeln!(
            out,
            "            <Shortcut Id=\"SC{}\" Name=\"{}\" Description=\"{}\" Target=\"[INSTALLDIR]{}\" WorkingDirectory=\"INSTALLDIR\"/>",
            ident(app, &key),
            xml_escape(&starter.display_name),
            xml_escape(&starter.description.replace('\n', " ")),
            xml_escape(&target)
        );
        if i == 0 {
            out.push_str(
                "            <RemoveFolder Id=\"ApplicationProgramsFolder\" On=\"uninstall\"/>\n",
            );
        }
        let _ = writeln!(
            out,
            "            <RegistryValue Root=\"HKCU\" Key=\"Software\\{}\" Name=\"{}\" Type=\"integer\" Value=\"1\" KeyPath=\"yes\"/>",
            xml_escape(&app.identifier),
            xml_escape(&starter.executable)
        );
        out.push_str("          </Component>\n");
        component_refs.push(component_id);
    }

    out.push_str("        </Directory>\n");
    out.push_str("      </Directory>\n");
}

/// Deterministic v5 GUID for a staged item, uppercase as WiX prefers.
fn guid(app: &AppDescriptor, key: &str) -> String {
    let name = format!("{}/{key}", app.identifier);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        .to_string()
        .to_uppercase()
}

/// Deterministic WiX identifier fragment (32 hex chars) for a staged item.
fn ident(app: &AppDescriptor, key: &str) -> String {
    let name = format!("{}/{key}", app.identifier);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string()
}

/// MSI product versions must be dotted numerics; strips any pre-release
/// suffix and falls back to 0.0.0.
fn msi_version(version: &str) -> String {
    let numeric: String = version
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let trimmed = numeric.trim_matches('.');
    if trimmed.is_empty() {
        "0.0.0".into()
    } else {
        trimmed.to_string()
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
