use crate::text::TextCache;
use crate::texture::{gray_pixmap, rgb_pixmap};
use ab_glyph::FontArc;
use anyhow::{Context, Result, ensure};
use rivalry_core::Phase;
use rivalry_stimuli::{AnaglyphStimuli, Cross, GratingTexture, StimulusSet};
use rivalry_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{
    BlendMode, Color, FilterQuality, LineCap, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};
use tracing::debug;

const TEXT_SIZE_PX: f32 = 32.0;
const LINE_GAP_PX: f32 = 16.0;

const INTRO_LINES: [&str; 2] = [
    "Watch the rotating pattern at the fixation cross",
    "and press a key each time the dominant colour changes",
];
const FINISHED_LINES: [&str; 1] = ["Thank you!"];

pub struct FrameStats {
    pub clear: Duration,
    pub phase: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Per-frame inputs besides the phase itself
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameView {
    /// Rotation added to both gratings' base orientation, degrees clockwise
    pub rotation: f64,
    /// Completed and total runs
    pub progress: Option<(usize, usize)>,
}

pub struct RendererOptions {
    pub background: [u8; 3],
    pub show_checker_cross: bool,
    pub font: Option<FontArc>,
    /// Key named in the intro and pause prompts
    pub continue_key: String,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            show_checker_cross: false,
            font: None,
            continue_key: "space".into(),
        }
    }
}

pub trait PhaseRenderer<P: Phase> {
    fn render_phase(&mut self, phase: &P, view: &FrameView) -> Result<()>;
}

/// Grating texture scaled to stimulus size around the screen centre
struct GratingLayer {
    pixmap: Pixmap,
    scale: f32,
    half_size: f32,
    base_ori: f32,
}

impl GratingLayer {
    fn new(grating: &GratingTexture) -> Result<Self> {
        let pixmap = rgb_pixmap(&grating.texture, &grating.mask, 1.0)?;
        let size = grating.size_px as f32;
        Ok(Self {
            scale: size / pixmap.width() as f32,
            half_size: size / 2.0,
            base_ori: grating.base_ori as f32,
            pixmap,
        })
    }

    fn transform(&self, rotation: f64, (cx, cy): (f32, f32)) -> Transform {
        Transform::from_rotate_at(self.base_ori + rotation as f32, cx, cy).pre_concat(
            Transform::from_translate(cx - self.half_size, cy - self.half_size)
                .pre_scale(self.scale, self.scale),
        )
    }
}

/// White cross drawn into its own pixmap, `line_width` thick.
fn cross_pixmap(cross: &Cross, line_width: f32) -> Result<Pixmap> {
    let extent = cross.width.max(cross.height) as f32;
    let side = (extent + 2.0 * line_width).ceil().max(3.0) as u32;
    let mut pm = Pixmap::new(side, side).context("cannot allocate cross pixmap")?;
    let c = side as f32 / 2.0;

    let mut pb = PathBuilder::new();
    // cross coordinates have y pointing up
    for ((x0, y0), (x1, y1)) in cross.at((0.0, 0.0)).segments() {
        pb.move_to(c + x0 as f32, c - y0 as f32);
        pb.line_to(c + x1 as f32, c - y1 as f32);
    }
    let path = pb.finish().context("empty cross path")?;

    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    let stroke = Stroke {
        width: line_width,
        line_cap: LineCap::Butt,
        ..Stroke::default()
    };
    pm.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    Ok(pm)
}

fn blit_centered(canvas: &mut Pixmap, pm: &Pixmap, (cx, cy): (f32, f32), blend_mode: BlendMode) {
    let x = (cx - pm.width() as f32 / 2.0).round() as i32;
    let y = (cy - pm.height() as f32 / 2.0).round() as i32;
    let paint = PixmapPaint {
        blend_mode,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(x, y, pm.as_ref(), &paint, Transform::identity(), None);
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    background: Color,

    red: GratingLayer,
    green: GratingLayer,
    rim: Pixmap,
    fixation: Pixmap,
    checker_cross: Option<Pixmap>,
    placeholder: Pixmap,
    text_cache: Option<TextCache>,
    continue_key: String,

    canvas: Pixmap,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    pub fn new(
        width: u32,
        height: u32,
        stimuli: &AnaglyphStimuli,
        options: RendererOptions,
    ) -> Result<Self> {
        let [r, g, b] = options.background;
        let background = Color::from_rgba8(r, g, b, 255);
        let mut canvas = Pixmap::new(width, height)
            .with_context(|| format!("cannot allocate {width}x{height} canvas"))?;
        canvas.fill(background);

        let set = &stimuli.set;
        let checker_cross = if options.show_checker_cross {
            Some(Self::checker_cross_pixmap(set)?)
        } else {
            None
        };
        let fixation = Self::fixation_pixmap(set, options.font.as_ref())?;
        let (rim, rim_mask) = set.rim.arrays();

        let renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            background,
            red: GratingLayer::new(&stimuli.red)?,
            green: GratingLayer::new(&stimuli.green)?,
            rim: gray_pixmap(&rim, &rim_mask, set.rim_contrast)?,
            fixation,
            checker_cross,
            placeholder: cross_pixmap(&Cross::new(TEXT_SIZE_PX as f64), 2.0)?,
            text_cache: options.font.map(|font| TextCache::new(font, TEXT_SIZE_PX)),
            continue_key: options.continue_key.to_uppercase(),
            canvas,
            component_timers: ["clear", "phase", "copy", "total"]
                .into_iter()
                .map(|k| (k, HighPrecisionTimer::new()))
                .collect(),
        };
        debug!(
            width,
            height,
            grating_px = renderer.red.pixmap.width(),
            rim_px = renderer.rim.width(),
            "renderer ready"
        );
        Ok(renderer)
    }

    fn fixation_pixmap(set: &StimulusSet, font: Option<&FontArc>) -> Result<Pixmap> {
        let size = set.fixation.size as f32;
        match font {
            Some(font) => crate::text::render_text_pixmap("+", size, font, Color::WHITE),
            None => cross_pixmap(&set.fixation.fallback_cross(), (size / 8.0).max(1.0)),
        }
    }

    fn checker_cross_pixmap(set: &StimulusSet) -> Result<Pixmap> {
        let (board, cross) = set.checker_cross.arrays();
        gray_pixmap(&board.mapv(f64::from), &cross, 1.0)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height)
            .with_context(|| format!("cannot allocate {new_width}x{new_height} canvas"))?;
        self.canvas.fill(self.background);
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        Ok(())
    }

    /// Frame time statistics of one render step (`clear`, `phase`, `copy`, `total`)
    pub fn component_stats(&self, component: &str) -> Option<CalibrationStats> {
        self.component_timers
            .get(component)
            .map(Timer::calibration_stats)
    }

    pub fn render_frame<P, T>(
        &mut self,
        phase: &P,
        view: &FrameView,
        frame_buffer: &mut [u8],
        timer: &T,
    ) -> Result<FrameStats>
    where
        P: Phase,
        T: Timer,
    {
        ensure!(
            frame_buffer.len() == self.canvas.data().len(),
            "frame buffer holds {} bytes, canvas {}x{} needs {}",
            frame_buffer.len(),
            self.width,
            self.height,
            self.canvas.data().len()
        );

        let t_clear = {
            let t = timer.now();
            self.canvas.fill(self.background);
            timer.elapsed(t)
        };

        let t_phase = {
            let t = timer.now();
            self.render_phase(phase, view)?;
            timer.elapsed(t)
        };

        // canvas stays opaque, so premultiplied bytes equal straight RGBA
        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_phase + t_copy;
        for (name, d) in [
            ("clear", t_clear),
            ("phase", t_phase),
            ("copy", t_copy),
            ("total", total),
        ] {
            if let Some(component) = self.component_timers.get_mut(name) {
                component.record_frame(d);
            }
        }

        Ok(FrameStats {
            clear: t_clear,
            phase: t_phase,
            copy: t_copy,
            total,
        })
    }

    fn draw_stimulus(&mut self, rotation: f64) {
        let additive = PixmapPaint {
            opacity: 1.0,
            blend_mode: BlendMode::Plus,
            quality: FilterQuality::Bilinear,
        };
        for layer in [&self.red, &self.green] {
            self.canvas.draw_pixmap(
                0,
                0,
                layer.pixmap.as_ref(),
                &additive,
                layer.transform(rotation, self.center),
                None,
            );
        }

        if let Some(board) = &self.checker_cross {
            blit_centered(&mut self.canvas, board, self.center, BlendMode::SourceOver);
        }
        blit_centered(&mut self.canvas, &self.rim, self.center, BlendMode::SourceOver);
        blit_centered(&mut self.canvas, &self.fixation, self.center, BlendMode::SourceOver);
    }

    fn intro_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = INTRO_LINES.iter().map(|l| l.to_string()).collect();
        lines.push(format!("Press {} to start", self.continue_key));
        lines
    }

    fn pause_lines(&self, completed: usize, total: usize) -> [String; 2] {
        [
            format!("Run {completed} of {total} completed"),
            format!("Press {} to continue", self.continue_key),
        ]
    }

    fn draw_text_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        let Some(cache) = self.text_cache.as_mut() else {
            blit_centered(&mut self.canvas, &self.placeholder, self.center, BlendMode::SourceOver);
            return Ok(());
        };

        let rendered = lines
            .iter()
            .map(|line| cache.get_or_render(line.as_ref()))
            .collect::<Result<Vec<Arc<Pixmap>>>>()?;
        let block_height = rendered.iter().map(|pm| pm.height() as f32).sum::<f32>()
            + LINE_GAP_PX * rendered.len().saturating_sub(1) as f32;

        let mut top = self.center.1 - block_height / 2.0;
        for pm in &rendered {
            let line_center = (self.center.0, top + pm.height() as f32 / 2.0);
            blit_centered(&mut self.canvas, pm, line_center, BlendMode::SourceOver);
            top += pm.height() as f32 + LINE_GAP_PX;
        }
        Ok(())
    }
}

impl<P> PhaseRenderer<P> for SkiaRenderer
where
    P: Phase,
{
    fn render_phase(&mut self, phase: &P, view: &FrameView) -> Result<()> {
        match phase {
            p if p.presents_stimulus() => self.draw_stimulus(view.rotation),
            p if p.awaits_continue() => match p.run() {
                None => {
                    let lines = self.intro_lines();
                    self.draw_text_lines(&lines)?;
                }
                Some(completed) => {
                    let total = view.progress.map_or(completed, |(_, total)| total);
                    let lines = self.pause_lines(completed, total);
                    self.draw_text_lines(&lines)?;
                }
            },
            p if p.is_finished() => self.draw_text_lines(&FINISHED_LINES)?,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalry_core::SessionPhase;
    use rivalry_stimuli::AnaglyphParams;
    use rivalry_timing::ManualTimer;

    const W: u32 = 100;
    const H: u32 = 100;

    fn stimuli() -> AnaglyphStimuli {
        AnaglyphStimuli::new(&AnaglyphParams {
            size_px: 40.0,
            n_cycles: 4.0,
            grating_resolution: 32,
            mask_fringe_width: 0.1,
            rim_ratio: 1.2,
            rim_n_parts: 8,
            rim_contrast: 1.0,
            fixation_proportion: 0.05,
        })
        .unwrap()
    }

    fn renderer(options: RendererOptions) -> SkiaRenderer {
        SkiaRenderer::new(W, H, &stimuli(), options).unwrap()
    }

    fn frame(r: &mut SkiaRenderer, phase: SessionPhase, view: FrameView) -> Vec<u8> {
        let mut fb = vec![0u8; (W * H * 4) as usize];
        r.render_frame(&phase, &view, &mut fb, &ManualTimer::new())
            .unwrap();
        fb
    }

    fn rgba(fb: &[u8], x: u32, y: u32) -> [u8; 4] {
        let i = ((y * W + x) * 4) as usize;
        [fb[i], fb[i + 1], fb[i + 2], fb[i + 3]]
    }

    #[test]
    fn gratings_mix_red_and_green_only() {
        let mut r = renderer(RendererOptions::default());
        let fb = frame(&mut r, SessionPhase::Stimulus { run: 1 }, FrameView::default());

        assert_eq!(rgba(&fb, 0, 0), [0, 0, 0, 255]);

        let mut saw_red = false;
        let mut saw_green = false;
        for y in 0..H {
            for x in 0..W {
                let (dx, dy) = (x as f32 + 0.5 - 50.0, y as f32 + 0.5 - 50.0);
                let dist = (dx * dx + dy * dy).sqrt();
                if !(5.0..15.0).contains(&dist) {
                    continue;
                }
                let [red, green, blue, alpha] = rgba(&fb, x, y);
                assert_eq!(blue, 0, "blue at {x},{y}");
                assert_eq!(alpha, 255);
                saw_red |= red > 0;
                saw_green |= green > 0;
            }
        }
        assert!(saw_red && saw_green);
    }

    #[test]
    fn rim_is_drawn_around_the_gratings() {
        let mut r = renderer(RendererOptions::default());
        let fb = frame(&mut r, SessionPhase::Stimulus { run: 1 }, FrameView::default());
        // diagonal sectors are white, axis-aligned ones black
        assert_eq!(rgba(&fb, 65, 65), [255, 255, 255, 255]);
        assert_eq!(rgba(&fb, 72, 50), [0, 0, 0, 255]);
    }

    #[test]
    fn rotation_changes_the_frame() {
        let mut r = renderer(RendererOptions::default());
        let a = frame(&mut r, SessionPhase::Stimulus { run: 1 }, FrameView::default());
        let b = frame(
            &mut r,
            SessionPhase::Stimulus { run: 1 },
            FrameView {
                rotation: 45.0,
                ..FrameView::default()
            },
        );
        assert_ne!(a, b);
    }

    #[test]
    fn text_screens_without_font_show_a_cross() {
        let mut r = renderer(RendererOptions::default());
        for phase in [
            SessionPhase::Intro,
            SessionPhase::Pause { completed: 1 },
            SessionPhase::Finished,
        ] {
            let fb = frame(&mut r, phase, FrameView::default());
            assert_eq!(rgba(&fb, 50, 50)[0], 255, "{phase:?}");
            assert_eq!(rgba(&fb, 0, 0), [0, 0, 0, 255]);
        }
    }

    #[test]
    fn background_colour_is_used() {
        let mut r = renderer(RendererOptions {
            background: [10, 20, 30],
            ..RendererOptions::default()
        });
        let fb = frame(&mut r, SessionPhase::Stimulus { run: 1 }, FrameView::default());
        assert_eq!(rgba(&fb, 1, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn checker_cross_is_optional() {
        let mut plain = renderer(RendererOptions::default());
        let mut checkered = renderer(RendererOptions {
            show_checker_cross: true,
            ..RendererOptions::default()
        });
        let view = FrameView::default();
        let phase = SessionPhase::Stimulus { run: 1 };
        assert_ne!(frame(&mut plain, phase, view), frame(&mut checkered, phase, view));
    }

    #[test]
    fn wrong_frame_buffer_size_is_an_error() {
        let mut r = renderer(RendererOptions::default());
        let mut fb = vec![0u8; 16];
        let res = r.render_frame(
            &SessionPhase::Intro,
            &FrameView::default(),
            &mut fb,
            &ManualTimer::new(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn resize_reallocates_the_canvas() {
        let mut r = renderer(RendererOptions::default());
        r.resize(64, 32).unwrap();
        let mut fb = vec![0u8; 64 * 32 * 4];
        r.render_frame(
            &SessionPhase::Stimulus { run: 1 },
            &FrameView::default(),
            &mut fb,
            &ManualTimer::new(),
        )
        .unwrap();
        assert_eq!((r.width(), r.height()), (64, 32));
    }

    #[test]
    fn prompts_name_the_configured_key() {
        let r = renderer(RendererOptions::default());
        assert_eq!(r.intro_lines().last().unwrap(), "Press SPACE to start");

        let r = renderer(RendererOptions {
            continue_key: "return".into(),
            ..RendererOptions::default()
        });
        assert_eq!(r.intro_lines().len(), 3);
        assert_eq!(r.intro_lines()[2], "Press RETURN to start");
        assert_eq!(
            r.pause_lines(2, 5),
            ["Run 2 of 5 completed", "Press RETURN to continue"]
        );
    }

    #[test]
    fn component_timers_count_frames() {
        let mut r = renderer(RendererOptions::default());
        for _ in 0..3 {
            frame(&mut r, SessionPhase::Intro, FrameView::default());
        }
        assert_eq!(r.component_timers["total"].frame_count(), 3);
        assert!(r.component_stats("phase").is_some());
        assert!(r.component_stats("bogus").is_none());
    }
}
