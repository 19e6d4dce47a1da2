//! Icon loading and rasterization.
//!
//! Descriptors list source icon images in any format the image decoder
//! understands; the platform drivers ask for concrete pixel sizes (Debian
//! hicolor wants 16, 32, 48, 64 and 128). Selection is a small heuristic:
//!
//! 1. Exact size match (best)
//! 2. Nearest size by Manhattan distance
//! 3. Square icons over non-square (penalized by 10000 in scoring)
//!
//! Missing or undecodable sources are skipped with a warning; when no
//! source is usable the rasterizer reports `None` instead of failing, and
//! the caller ships without that icon size.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorExt, Result};

/// Icon metadata with dimensions.
#[derive(Debug, Clone)]
pub struct IconInfo {
    /// Path to the icon file.
    pub path: PathBuf,

    /// Icon width in pixels.
    pub width: u32,

    /// Icon height in pixels.
    pub height: u32,
}

impl IconInfo {
    /// Returns whether this icon is square (width == height).
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Manhattan distance from a square target size.
    pub fn size_diff(&self, target: u32) -> u32 {
        ((self.width as i32 - target as i32).abs() + (self.height as i32 - target as i32).abs())
            as u32
    }
}

/// Reads the dimensions of every usable source icon.
///
/// Missing and undecodable files are logged as warnings and skipped, so
/// the result may be empty.
pub fn load_icons(icon_paths: &[PathBuf]) -> Vec<IconInfo> {
    let mut icons = Vec::new();

    for path in icon_paths {
        if !path.exists() {
            log::warn!("icon path does not exist: {}", path.display());
            continue;
        }
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("skipping unreadable icon {}: {e}", path.display());
                continue;
            }
        };

        log::debug!(
            "loaded icon: {}x{} from {}",
            img.width(),
            img.height(),
            path.display()
        );
        icons.push(IconInfo {
            path: path.clone(),
            width: img.width(),
            height: img.height(),
        });
    }

    icons
}

/// Finds the best source icon for a square target size.
///
/// Returns `None` only for an empty slice.
pub fn find_icon_for_size(icons: &[IconInfo], target_size: u32) -> Option<&IconInfo> {
    icons.iter().min_by_key(|icon| {
        let size_diff = icon.size_diff(target_size);
        let square_penalty = if icon.is_square() { 0 } else { 10000 };
        size_diff + square_penalty
    })
}

/// Rasterizes the best source icon to `size`×`size` and writes it as PNG.
///
/// Returns the destination path, or `None` when no source icon is usable.
/// Resizing uses Lanczos3 filtering for downscaling quality.
pub async fn rasterize(icons: &[IconInfo], size: u32, dest: &Path) -> Result<Option<PathBuf>> {
    let Some(best) = find_icon_for_size(icons, size) else {
        return Ok(None);
    };

    let img = image::open(&best.path).map_err(|e| Error::Fs {
        context: "loading icon for resize",
        path: best.path.clone(),
        error: io::Error::other(e),
    })?;
    let resized = img
        .resize_exact(size, size, image::imageops::FilterType::Lanczos3)
        .to_rgba8();

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating icon directory", parent)?;
    }
    resized.save_with_format(dest, image::ImageFormat::Png)?;

    Ok(Some(dest.to_path_buf()))
}
