//! Page image → base64 PNG wrapped in `ImageData` for the vision request.
//!
//! PNG over JPEG: compression artefacts around glyph edges hurt recognition
//! far more than the larger payload hurts latency.

use crate::error::{Result, WorkbenchError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

pub fn encode_png(img: &DynamicImage) -> Result<ImageData> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| WorkbenchError::Internal(format!("PNG encoding failed: {e}")))?;

    let b64 = STANDARD.encode(&buf);
    debug!(png_bytes = buf.len(), b64_bytes = b64.len(), "Encoded page image");

    // "high" keeps fine print readable on tiling vision APIs.
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
