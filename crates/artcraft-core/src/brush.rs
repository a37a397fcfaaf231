//! Drawing tools and brush settings.

use crate::color::Rgb;
use serde::{Deserialize, Serialize};

/// Default brush diameter in surface pixels.
pub const DEFAULT_BRUSH_SIZE: u32 = 5;

/// Available drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    /// Paints the background color. Never produces transparency.
    Eraser,
}

/// Brush parameters read by the renderer for every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushSettings {
    pub color: Rgb,
    /// Stroke width in pixels, always at least 1.
    pub brush_size: u32,
    pub tool: Tool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: Rgb::BLACK,
            brush_size: DEFAULT_BRUSH_SIZE,
            tool: Tool::Brush,
        }
    }
}

impl BrushSettings {
    pub fn new(color: Rgb, brush_size: u32, tool: Tool) -> Self {
        Self {
            color,
            brush_size: brush_size.max(1),
            tool,
        }
    }

    /// The color actually laid down on the surface.
    pub fn paint_color(&self) -> Rgb {
        match self.tool {
            Tool::Brush => self.color,
            Tool::Eraser => Rgb::WHITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let brush = BrushSettings::default();
        assert_eq!(brush.color, Rgb::BLACK);
        assert_eq!(brush.brush_size, 5);
        assert_eq!(brush.tool, Tool::Brush);
    }

    #[test]
    fn test_eraser_paints_white() {
        let brush = BrushSettings::new(Rgb::new(10, 20, 30), 3, Tool::Eraser);
        assert_eq!(brush.paint_color(), Rgb::WHITE);
    }

    #[test]
    fn test_size_clamped_to_one() {
        assert_eq!(BrushSettings::new(Rgb::BLACK, 0, Tool::Brush).brush_size, 1);
    }
}
