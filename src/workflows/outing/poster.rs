use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::imageops::FilterType;
use image::{DynamicImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use qrcode::{EcLevel, QrCode};

use super::domain::{Route, VoteOptionDraft};

/// Canvas size in pixels; every poster comes out exactly this large.
pub const POSTER_WIDTH: u32 = 1080;
pub const POSTER_HEIGHT: u32 = 1920;

const TITLE_SIZE: f32 = 72.0;
const SUBTITLE_SIZE: f32 = 48.0;
const CONTENT_SIZE: f32 = 36.0;
const SMALL_SIZE: f32 = 28.0;

/// Alpha of the black layer composited over the background so overlaid
/// text stays legible on bright photos.
const OVERLAY_ALPHA: u8 = 100;

const CARD_MARGIN: i64 = 40;
const QR_SIZE: u32 = 250;
const QR_Y: i64 = 1450;
const CAPTION_Y: i64 = 1720;
const TAGLINE_Y: i64 = 1850;

/// At most this many vote options are drawn; the rest are silently omitted.
const MAX_POSTER_OPTIONS: usize = 4;

const CAPTION: &str = "扫码选择活动日期";
const TAGLINE: &str = "公益徒步 · 安全第一 · 快乐同行";

/// Candidate font files, tried in order at construction time.
const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    "C:/Windows/Fonts/msyh.ttc",
];

#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("vote url does not fit in a qr code: {0}")]
    Qr(#[from] qrcode::types::QrError),
    #[error("failed to prepare poster output directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode poster image: {0}")]
    Encode(#[from] image::ImageError),
}

enum FontFace {
    System(FontVec),
    /// 8×8 bitmap face covering basic ASCII; CJK glyphs are skipped but the
    /// layout advances as if they were drawn.
    Builtin,
}

/// Renders the fixed-layout promotional poster. Construction probes the
/// system font list once; a machine with no usable font still composes,
/// just less legibly.
pub struct PosterCompositor {
    face: FontFace,
}

impl Default for PosterCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl PosterCompositor {
    pub fn new() -> Self {
        Self { face: load_font() }
    }

    /// Compose the poster onto the fixed canvas. The background is
    /// stretched to fill the canvas exactly, whatever its size, so output
    /// dimensions never depend on input dimensions.
    pub fn compose(
        &self,
        route: &Route,
        theme: &str,
        background: &DynamicImage,
        vote_url: &str,
        options: &[VoteOptionDraft],
    ) -> Result<RgbaImage, PosterError> {
        let mut canvas = background
            .resize_exact(POSTER_WIDTH, POSTER_HEIGHT, FilterType::Triangle)
            .to_rgba8();
        for pixel in canvas.pixels_mut() {
            pixel.blend(&Rgba([0, 0, 0, OVERLAY_ALPHA]));
        }

        self.draw_centered(&mut canvas, theme, TITLE_SIZE, 100, Rgba([255, 255, 255, 255]));
        self.draw_centered(
            &mut canvas,
            &route.name,
            SUBTITLE_SIZE,
            200,
            Rgba([255, 255, 255, 255]),
        );

        self.draw_route_card(&mut canvas, route, 350);
        self.draw_vote_options(&mut canvas, options, 700);
        self.draw_qr(&mut canvas, vote_url)?;

        self.draw_centered(
            &mut canvas,
            CAPTION,
            CONTENT_SIZE,
            CAPTION_Y,
            Rgba([255, 255, 255, 255]),
        );
        self.draw_centered(
            &mut canvas,
            TAGLINE,
            SMALL_SIZE,
            TAGLINE_Y,
            Rgba([255, 255, 255, 255]),
        );

        Ok(canvas)
    }

    /// Compose and PNG-encode to `path`, creating parent directories.
    pub fn compose_to_file(
        &self,
        route: &Route,
        theme: &str,
        background: &DynamicImage,
        vote_url: &str,
        options: &[VoteOptionDraft],
        path: &Path,
    ) -> Result<(), PosterError> {
        let poster = self.compose(route, theme, background, vote_url, options)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        poster.save(path)?;
        Ok(())
    }

    fn draw_route_card(&self, canvas: &mut RgbaImage, route: &Route, y: i64) {
        let card_height = 250;
        // 2px outline, drawn as a slightly larger rounded rect underneath.
        fill_rounded_rect(
            canvas,
            CARD_MARGIN - 2,
            y - 2,
            POSTER_WIDTH as i64 - CARD_MARGIN + 2,
            y + card_height + 2,
            22,
            Rgba([200, 200, 200, 255]),
        );
        fill_rounded_rect(
            canvas,
            CARD_MARGIN,
            y,
            POSTER_WIDTH as i64 - CARD_MARGIN,
            y + card_height,
            20,
            Rgba([255, 255, 255, 255]),
        );

        let lines = [
            format!("路线：{}", route.name),
            format!("里程：{}公里 | 爬升：{}米", route.distance_km, route.elevation_m),
            format!(
                "时长：{}小时 | 难度：{}",
                route.duration_hours,
                route.difficulty.label()
            ),
        ];
        let mut line_y = y + 50;
        for line in &lines {
            self.draw_text(canvas, line, CONTENT_SIZE, 80, line_y, Rgba([50, 50, 50, 255]));
            line_y += 60;
        }
    }

    fn draw_vote_options(&self, canvas: &mut RgbaImage, options: &[VoteOptionDraft], y: i64) {
        self.draw_text(
            canvas,
            "活动日期投票",
            SUBTITLE_SIZE,
            60,
            y,
            Rgba([255, 255, 255, 255]),
        );

        let card_height = 80;
        let first_card_y = y + 70;
        for (index, option) in options.iter().take(MAX_POSTER_OPTIONS).enumerate() {
            let card_y = first_card_y + index as i64 * (card_height + 15);
            fill_rounded_rect(
                canvas,
                CARD_MARGIN,
                card_y,
                POSTER_WIDTH as i64 - CARD_MARGIN,
                card_y + card_height,
                10,
                Rgba([255, 255, 255, 230]),
            );
            self.draw_text(
                canvas,
                &option.label,
                CONTENT_SIZE,
                70,
                card_y + 15,
                Rgba([50, 50, 50, 255]),
            );
            self.draw_text(
                canvas,
                &option.weather,
                SMALL_SIZE,
                70,
                card_y + 45,
                Rgba([100, 100, 100, 255]),
            );
        }
    }

    fn draw_qr(&self, canvas: &mut RgbaImage, vote_url: &str) -> Result<(), PosterError> {
        let code = QrCode::with_error_correction_level(vote_url, EcLevel::L)?;
        let modules = code.render::<Luma<u8>>().quiet_zone(true).build();
        let qr = image::imageops::resize(&modules, QR_SIZE, QR_SIZE, FilterType::Nearest);

        let left = (POSTER_WIDTH - QR_SIZE) / 2;
        for (x, y, pixel) in qr.enumerate_pixels() {
            let value = pixel.0[0];
            canvas.put_pixel(left + x, QR_Y as u32 + y, Rgba([value, value, value, 255]));
        }
        Ok(())
    }

    fn draw_centered(&self, canvas: &mut RgbaImage, text: &str, size: f32, y: i64, color: Rgba<u8>) {
        let width = self.text_width(text, size) as i64;
        let x = (POSTER_WIDTH as i64 - width) / 2;
        self.draw_text(canvas, text, size, x, y, color);
    }

    fn text_width(&self, text: &str, size: f32) -> u32 {
        match &self.face {
            FontFace::System(font) => text_size(PxScale::from(size), font, text).0,
            FontFace::Builtin => text.chars().count() as u32 * 8 * builtin_scale(size),
        }
    }

    fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        size: f32,
        x: i64,
        y: i64,
        color: Rgba<u8>,
    ) {
        match &self.face {
            FontFace::System(font) => {
                draw_text_mut(canvas, color, x as i32, y as i32, PxScale::from(size), font, text);
            }
            FontFace::Builtin => draw_builtin_text(canvas, text, x, y, builtin_scale(size), color),
        }
    }
}

fn load_font() -> FontFace {
    for path in FONT_PATHS {
        if let Ok(data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec_and_index(data, 0) {
                tracing::debug!(path, "poster font loaded");
                return FontFace::System(font);
            }
        }
    }
    tracing::warn!("no usable system font found, using built-in bitmap face");
    FontFace::Builtin
}

fn builtin_scale(size: f32) -> u32 {
    ((size / 8.0).round() as u32).max(1)
}

fn draw_builtin_text(
    canvas: &mut RgbaImage,
    text: &str,
    x: i64,
    y: i64,
    scale: u32,
    color: Rgba<u8>,
) {
    let mut cursor = x;
    let step = (8 * scale) as i64;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8u32 {
                    if bits >> col & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = cursor + (col * scale + dx) as i64;
                            let py = y + (row as u32 * scale + dy) as i64;
                            blend_pixel(canvas, px, py, color);
                        }
                    }
                }
            }
        }
        cursor += step;
    }
}

fn fill_rounded_rect(
    canvas: &mut RgbaImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    radius: i64,
    color: Rgba<u8>,
) {
    let r2 = radius * radius;
    let corner = |x: i64, y: i64, cx: i64, cy: i64| {
        let dx = x - cx;
        let dy = y - cy;
        dx * dx + dy * dy <= r2
    };

    for y in y0..=y1 {
        for x in x0..=x1 {
            let inside = if x < x0 + radius && y < y0 + radius {
                corner(x, y, x0 + radius, y0 + radius)
            } else if x > x1 - radius && y < y0 + radius {
                corner(x, y, x1 - radius, y0 + radius)
            } else if x < x0 + radius && y > y1 - radius {
                corner(x, y, x0 + radius, y1 - radius)
            } else if x > x1 - radius && y > y1 - radius {
                corner(x, y, x1 - radius, y1 - radius)
            } else {
                true
            };
            if inside {
                blend_pixel(canvas, x, y, color);
            }
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    canvas.get_pixel_mut(x as u32, y as u32).blend(&color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scale_never_collapses_to_zero() {
        assert_eq!(builtin_scale(72.0), 9);
        assert_eq!(builtin_scale(28.0), 4);
        assert_eq!(builtin_scale(3.0), 1);
    }

    #[test]
    fn rounded_rect_clips_to_the_canvas() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        fill_rounded_rect(&mut canvas, -5, -5, 20, 20, 3, Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 5).0, [255, 255, 255, 255]);
    }
}
