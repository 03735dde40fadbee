//! Caption card rendering.
//!
//! Captions are rasterised into a PNG card (black band, white stroked text,
//! centered lines) that FFmpeg overlays at the bottom of the frame.
//!
//! # Architecture
//!
//! - `CaptionStyle`: builder-style styling configuration
//! - `wrap_words`: greedy word wrap against a width measure
//! - `render_caption`: draws the card with `imageproc`
//! - `write_caption_png`: renders and encodes the card to disk

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

// =============================================================================
// Constants
// =============================================================================

/// Common font locations checked when no font path is configured.
const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub const DEFAULT_FONT_SIZE: f32 = 48.0;
pub const DEFAULT_STROKE_WIDTH: u32 = 2;
pub const DEFAULT_MAX_WIDTH_RATIO: f32 = 0.8;

// =============================================================================
// Configuration
// =============================================================================

/// Styling of the caption card.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    /// Explicit font file; fallbacks are searched when unset
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub text_color: Rgba<u8>,
    pub background: Rgba<u8>,
    pub stroke_color: Rgba<u8>,
    pub stroke_width: u32,
    /// Card width as a fraction of the frame width
    pub max_width_ratio: f32,
    /// Inner padding around the text block (pixels)
    pub padding: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: DEFAULT_FONT_SIZE,
            text_color: Rgba([255, 255, 255, 255]),
            background: Rgba([0, 0, 0, 255]),
            stroke_color: Rgba([255, 255, 255, 255]),
            stroke_width: DEFAULT_STROKE_WIDTH,
            max_width_ratio: DEFAULT_MAX_WIDTH_RATIO,
            padding: 8,
        }
    }
}

impl CaptionStyle {
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size.max(1.0);
        self
    }

    /// Card width for a frame, rounded down to an even number of pixels.
    pub fn card_width(&self, frame_width: u32) -> u32 {
        let width = (frame_width as f32 * self.max_width_ratio).floor() as u32;
        (width & !1).max(2)
    }
}

// =============================================================================
// Fonts
// =============================================================================

/// Resolve the caption font, checking fallbacks if none is configured.
pub fn resolve_font_path(configured: Option<&Path>) -> MediaResult<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(MediaError::FontNotFound(path.display().to_string()));
    }

    for candidate in FALLBACK_FONT_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            debug!(path = candidate, "Using fallback caption font");
            return Ok(path.to_path_buf());
        }
    }

    Err(MediaError::FontNotFound(FALLBACK_FONT_PATHS.join(", ")))
}

/// Load a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> MediaResult<FontVec> {
    let data = std::fs::read(path)?;
    FontVec::try_from_vec(data)
        .map_err(|e| MediaError::caption(format!("invalid font {}: {}", path.display(), e)))
}

/// Advance width of a single line of text.
fn line_width<F: Font>(font: &F, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous = None;

    for c in text.chars() {
        let glyph = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, glyph);
        }
        width += scaled.h_advance(glyph);
        previous = Some(glyph);
    }

    width
}

// =============================================================================
// Layout
// =============================================================================

/// Greedy word wrap. Words wider than `max_width` are split by character.
pub fn wrap_words<M>(text: &str, max_width: f32, measure: M) -> Vec<String>
where
    M: Fn(&str) -> f32,
{
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if measure(word) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if !current.is_empty() && measure(&next) > max_width {
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    } else {
                        current = next;
                    }
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a caption card for a frame of `frame_width` pixels.
pub fn render_caption<F: Font>(
    text: &str,
    frame_width: u32,
    style: &CaptionStyle,
    font: &F,
) -> MediaResult<RgbaImage> {
    let scale = PxScale::from(style.font_size);
    let card_width = style.card_width(frame_width);
    let inner_width = card_width.saturating_sub(2 * (style.padding + style.stroke_width)) as f32;

    let lines = wrap_words(text, inner_width, |s| line_width(font, scale, s));
    if lines.is_empty() {
        return Err(MediaError::caption("caption text is blank"));
    }

    let scaled = font.as_scaled(scale);
    let line_height = (scaled.height() + scaled.line_gap()).ceil().max(1.0) as u32;
    let text_height = line_height * lines.len() as u32;
    let card_height = ((text_height + 2 * (style.padding + style.stroke_width)) + 1) & !1;

    let mut card = RgbaImage::from_pixel(card_width, card_height, style.background);
    let stroke = style.stroke_width as i32;

    for (index, line) in lines.iter().enumerate() {
        let width = line_width(font, scale, line).ceil() as i32;
        let x = (card_width as i32 - width) / 2;
        let y = (style.padding + style.stroke_width) as i32 + (index as u32 * line_height) as i32;

        if stroke > 0 {
            for dy in -stroke..=stroke {
                for dx in -stroke..=stroke {
                    if (dx != 0 || dy != 0) && dx * dx + dy * dy <= stroke * stroke {
                        draw_text_mut(&mut card, style.stroke_color, x + dx, y + dy, scale, font, line);
                    }
                }
            }
        }
        draw_text_mut(&mut card, style.text_color, x, y, scale, font, line);
    }

    Ok(card)
}

/// Render a caption card and write it as PNG. Returns the card size.
pub async fn write_caption_png(
    text: &str,
    frame_width: u32,
    style: &CaptionStyle,
    out_path: &Path,
) -> MediaResult<(u32, u32)> {
    let font_path = resolve_font_path(style.font_path.as_deref())?;
    let text = text.to_string();
    let style = style.clone();
    let out_path = out_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> MediaResult<(u32, u32)> {
        let font = load_font(&font_path)?;
        let card = render_caption(&text, frame_width, &style, &font)?;
        card.save_with_format(&out_path, image::ImageFormat::Png)?;
        debug!(
            width = card.width(),
            height = card.height(),
            path = %out_path.display(),
            "Rendered caption card"
        );
        Ok((card.width(), card.height()))
    })
    .await
    .map_err(|e| MediaError::internal(format!("caption render task failed: {}", e)))?
}
