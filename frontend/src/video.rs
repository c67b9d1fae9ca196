//! Host window for the 96x64 monochrome panel.
//!
//! Unlike a machine with interchangeable video hardware, the Pokémon Mini
//! always presents the same tiny SED1565 surface, so the presenter is
//! specialized to it: one RGB24 texture of exactly panel size, blown up by
//! an integer factor so the chunky LCD pixels stay square, letterboxed on
//! a dark bezel when the output area is not an exact multiple.

use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};

/// SED1565 panel resolution.
pub const PANEL_W: u32 = 96;
pub const PANEL_H: u32 = 64;

/// Bytes per presented frame (RGB24).
pub const PANEL_FRAME_BYTES: usize = (PANEL_W * PANEL_H * 3) as usize;

/// Shell color around the letterboxed panel.
const BEZEL: Color = Color::RGB(0x20, 0x24, 0x20);

pub struct PanelWindow {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
}

impl PanelWindow {
    /// Create the window at `scale` times the native panel size.
    pub fn new(sdl_video: &sdl2::VideoSubsystem, title: &str, scale: u32) -> Self {
        let scale = scale.max(1);
        let window = sdl_video
            .window(title, PANEL_W * scale, PANEL_H * scale)
            .position_centered()
            .build()
            .expect("Failed to create window");

        let canvas = window
            .into_canvas()
            .accelerated()
            .build()
            .expect("Failed to create canvas");

        let texture_creator = canvas.texture_creator();

        Self {
            canvas,
            texture_creator,
        }
    }

    /// The largest panel rectangle that fits the current output at a whole
    /// multiple of 96x64, centered.
    fn panel_rect(&self) -> Rect {
        let (out_w, out_h) = self.canvas.output_size().unwrap_or((PANEL_W, PANEL_H));
        let factor = (out_w / PANEL_W).min(out_h / PANEL_H).max(1);
        let w = PANEL_W * factor;
        let h = PANEL_H * factor;
        Rect::new(
            ((out_w.saturating_sub(w)) / 2) as i32,
            ((out_h.saturating_sub(h)) / 2) as i32,
            w,
            h,
        )
    }

    /// Upload one panel frame and present it.
    ///
    /// `frame` is the machine's RGB24 rendering of the panel and must be
    /// exactly [`PANEL_FRAME_BYTES`] long.
    pub fn present(&mut self, frame: &[u8]) {
        assert_eq!(frame.len(), PANEL_FRAME_BYTES);

        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, PANEL_W, PANEL_H)
            .expect("Failed to create panel texture");

        texture
            .update(None, frame, (PANEL_W * 3) as usize)
            .expect("Failed to update panel texture");

        self.canvas.set_draw_color(BEZEL);
        self.canvas.clear();
        self.canvas
            .copy(&texture, None, self.panel_rect())
            .expect("Failed to copy panel texture");
        self.canvas.present();
    }

    pub fn set_title(&mut self, title: &str) {
        let _ = self.canvas.window_mut().set_title(title);
    }
}
