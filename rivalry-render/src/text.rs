use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Color, ColorU8, Pixmap};
use tracing::{debug, warn};

/// Places a font is looked for when none is configured
pub const FONT_SEARCH_PATHS: &[&str] = &[
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn read_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("{} is not a usable font", path.display()))
}

/// Loads the configured font, or the first usable one from [`FONT_SEARCH_PATHS`].
pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    if let Some(path) = configured {
        match read_font(path) {
            Ok(font) => return Some(font),
            Err(err) => warn!("configured font unusable: {err:#}"),
        }
    }
    let found = FONT_SEARCH_PATHS.iter().map(Path::new).find_map(|p| {
        let font = read_font(p).ok()?;
        debug!(path = %p.display(), "font loaded");
        Some(font)
    });
    if found.is_none() {
        warn!("no font found, text screens fall back to a fixation cross");
    }
    found
}

/// Rasterizes one line of text into a tightly cropped, premultiplied pixmap.
pub fn render_text_pixmap(text: &str, font_size: f32, font: &FontArc, color: Color) -> Result<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs.into_iter().filter_map(|g| font.outline_glyph(g)).collect();
    if outlines.is_empty() {
        return Pixmap::new(1, 1).context("empty text pixmap");
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // Coverage first; overlapping glyph edges keep the stronger value
    let mut coverage = vec![0.0f32; (w * h) as usize];
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            let ix = (x as f32 + b.min.x - min_x).floor() as i64;
            let iy = (y as f32 + b.min.y - min_y).floor() as i64;
            if ix < 0 || iy < 0 || ix >= w as i64 || iy >= h as i64 {
                return;
            }
            let cell = &mut coverage[iy as usize * w as usize + ix as usize];
            *cell = cell.max(cov);
        });
    }

    let c = color.to_color_u8();
    let mut pm = Pixmap::new(w, h).with_context(|| format!("cannot allocate {w}x{h} text pixmap"))?;
    for (px, cov) in pm.pixels_mut().iter_mut().zip(coverage) {
        let a = (cov.clamp(0.0, 1.0) * c.alpha() as f32).round() as u8;
        *px = ColorU8::from_rgba(c.red(), c.green(), c.blue(), a).premultiply();
    }
    Ok(pm)
}

/// Rendered text lines, keyed by their content
pub struct TextCache {
    font: FontArc,
    size_px: f32,
    map: HashMap<String, Arc<Pixmap>>,
}

impl TextCache {
    pub fn new(font: FontArc, size_px: f32) -> Self {
        Self {
            font,
            size_px,
            map: HashMap::new(),
        }
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get_or_render(&mut self, text: &str) -> Result<Arc<Pixmap>> {
        if let Some(p) = self.map.get(text) {
            return Ok(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(
            text,
            self.size_px,
            &self.font,
            Color::WHITE,
        )?);
        self.map.insert(text.to_owned(), Arc::clone(&pm));
        Ok(pm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configured_font_falls_back_to_search_list() {
        let missing = Path::new("/nonexistent/font.ttf");
        let err = read_font(missing).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/font.ttf"));
        assert_eq!(load_font(Some(missing)).is_some(), load_font(None).is_some());
    }

    #[test]
    fn garbage_is_not_a_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let err = read_font(&path).unwrap_err();
        assert!(format!("{err:#}").contains("is not a usable font"));
        assert_eq!(load_font(Some(path.as_path())).is_some(), load_font(None).is_some());
    }

    #[test]
    #[ignore = "needs a system font from FONT_SEARCH_PATHS"]
    fn text_pixmap_is_cropped_and_cached() {
        let font = load_font(None).expect("no font in FONT_SEARCH_PATHS");
        let mut cache = TextCache::new(font, 32.0);
        let plus = cache.get_or_render("+").unwrap();
        let wide = cache.get_or_render("Press SPACE").unwrap();
        assert!(wide.width() > plus.width());
        assert!(plus.height() <= 32);
        assert!(plus.pixels().iter().any(|p| p.alpha() > 0));

        let again = cache.get_or_render("+").unwrap();
        assert!(Arc::ptr_eq(&plus, &again));
        assert_eq!(cache.len(), 2);
    }
}
