//! Framebuffer snapshots.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use boxvm_kernel::FrameBuffer;

/// Write `fb` to `path` as an RGB PNG.
pub fn save_png(fb: &FrameBuffer, path: &Path) -> Result<()> {
    let img = image::RgbImage::from_raw(fb.width(), fb.height(), fb.to_rgb_bytes())
        .ok_or_else(|| anyhow!("invalid image data"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write PNG: {}", path.display()))?;
    tracing::info!(path = %path.display(), width = fb.width(), height = fb.height(), "framebuffer snapshot written");
    Ok(())
}
