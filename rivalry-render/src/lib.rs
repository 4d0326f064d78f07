pub mod render;
pub mod text;
pub mod texture;

pub use render::{FrameStats, FrameView, PhaseRenderer, RendererOptions, SkiaRenderer};
pub use text::{FONT_SEARCH_PATHS, TextCache, load_font, render_text_pixmap};
pub use texture::{gray_pixmap, rgb_pixmap, signed_to_u8};
