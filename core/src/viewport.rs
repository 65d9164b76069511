//! 640x480 viewport emulation
//!
//! The host addresses a fixed 640x480 screen. [`InternalResolution`] maps
//! those coordinates onto the real view (optionally pillarboxed to 4:3) and
//! [`ViewportEmulation`] rebuilds the transform a Direct3D viewport would
//! have applied.

use glam::{Mat4, Vec4};

use crate::config::VideoConfig;
use crate::surface::ViewportRect;

/// Width of the host's virtual screen
pub const GAME_WIDTH: f32 = 640.0;
/// Height of the host's virtual screen
pub const GAME_HEIGHT: f32 = 480.0;

/// Size and placement of the rendered view inside the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalResolution {
    pub window_width: u32,
    pub window_height: u32,
    pub view_width: f32,
    pub view_height: f32,
    /// Horizontal pillarbox offset
    pub offset_x: f32,
}

impl InternalResolution {
    pub fn new(window_width: u32, window_height: u32, preserve_aspect_ratio: bool) -> Self {
        let view_height = window_height as f32;
        let view_width = if preserve_aspect_ratio {
            view_height / 3.0 * 4.0
        } else {
            window_width as f32
        };
        let offset_x = if preserve_aspect_ratio {
            (window_width as f32 - view_width) / 2.0
        } else {
            0.0
        };
        Self {
            window_width,
            window_height,
            view_width,
            view_height,
            offset_x,
        }
    }

    pub fn from_config(video: &VideoConfig) -> Self {
        Self::new(video.width, video.height, video.preserve_aspect_ratio)
    }

    /// Scale a virtual-screen x coordinate to the view.
    pub fn internal_x(&self, x: f32) -> f32 {
        x * self.view_width / GAME_WIDTH
    }

    /// Scale a virtual-screen y coordinate to the view.
    pub fn internal_y(&self, y: f32) -> f32 {
        y * self.view_height / GAME_HEIGHT
    }
}

impl Default for InternalResolution {
    fn default() -> Self {
        Self::new(GAME_WIDTH as u32, GAME_HEIGHT as u32, true)
    }
}

/// Direct3D viewport transform emulation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportEmulation {
    pub resolution: InternalResolution,
}

impl ViewportEmulation {
    pub fn new(resolution: InternalResolution) -> Self {
        Self { resolution }
    }

    /// View matrix and surface viewport for a host viewport in 640x480
    /// coordinates.
    ///
    /// `full_height` keeps the vertical scale at 1 regardless of the
    /// viewport height (battle scenes rely on it).
    pub fn emulate(&self, x: u32, y: u32, width: u32, height: u32, full_height: bool) -> (Mat4, ViewportRect) {
        let (x, y, w, h) = (x as f32, y as f32, width as f32, height as f32);
        let half_w = GAME_WIDTH / 2.0;
        let half_h = GAME_HEIGHT / 2.0;

        let scale_y = if full_height { 1.0 } else { h / GAME_HEIGHT };
        let view = Mat4::from_cols(
            Vec4::new(w / GAME_WIDTH, 0.0, 0.0, 0.0),
            Vec4::new(0.0, scale_y, 0.0, 0.0),
            Vec4::Z,
            Vec4::new(((x + w / 2.0) - half_w) / half_w, -((y + h / 2.0) - half_h) / half_h, 0.0, 1.0),
        );

        let res = &self.resolution;
        let rect = ViewportRect {
            x: res.internal_x(x) as i32,
            y: (res.window_height as f32 - res.internal_y(y + h)) as i32,
            width: res.internal_x(w) as u32,
            height: res.internal_y(h) as u32,
        };
        (view, rect)
    }
}
