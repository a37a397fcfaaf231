//! Stroke rasterization.
//!
//! Integer surface coordinates address pixel centres. A segment covers every
//! pixel whose centre lies within `brush_size / 2` of the segment, which gives
//! round caps and, across consecutive segments of one stroke, round joins.
//! Painting overwrites pixels, so re-drawing a segment is idempotent.

use crate::brush::BrushSettings;
use crate::color::Rgb;
use crate::surface::Surface;
use kurbo::Point;

/// One straight piece of a stroke, with the brush it was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from_x: i32,
    pub from_y: i32,
    pub to_x: i32,
    pub to_y: i32,
    pub brush: BrushSettings,
}

impl Segment {
    pub fn new(from: (i32, i32), to: (i32, i32), brush: BrushSettings) -> Self {
        Self {
            from_x: from.0,
            from_y: from.1,
            to_x: to.0,
            to_y: to.1,
            brush,
        }
    }

    /// Rasterize this segment onto `surface`.
    pub fn draw(&self, surface: &mut Surface) {
        draw_segment(
            surface,
            self.from_x,
            self.from_y,
            self.to_x,
            self.to_y,
            &self.brush,
        );
    }
}

/// Draw a round-capped line of width `brush.brush_size` between two points.
///
/// Pixels outside the surface are clipped. `from == to` paints a dot.
pub fn draw_segment(
    surface: &mut Surface,
    from_x: i32,
    from_y: i32,
    to_x: i32,
    to_y: i32,
    brush: &BrushSettings,
) {
    let color = brush.paint_color();
    let radius = brush.brush_size.max(1) as f64 / 2.0;
    let a = Point::new(from_x as f64, from_y as f64);
    let b = Point::new(to_x as f64, to_y as f64);

    let min_x = (a.x.min(b.x) - radius).floor().max(0.0) as i64;
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0) as i64;
    let max_x = (a.x.max(b.x) + radius).ceil().min(surface.width() as f64 - 1.0) as i64;
    let max_y = (a.y.max(b.y) + radius).ceil().min(surface.height() as f64 - 1.0) as i64;

    let ab = b - a;
    let len2 = ab.hypot2();
    let r2 = radius * radius;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Point::new(x as f64, y as f64);
            let t = if len2 == 0.0 {
                0.0
            } else {
                ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
            };
            let nearest = a + ab * t;
            if (p - nearest).hypot2() <= r2 {
                surface.set_pixel(x, y, color);
            }
        }
    }
}

/// Fill the whole surface with white.
pub fn clear_surface(surface: &mut Surface) {
    surface.fill(Rgb::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::Tool;

    fn red(size: u32) -> BrushSettings {
        BrushSettings::new(Rgb::new(255, 0, 0), size, Tool::Brush)
    }

    #[test]
    fn test_horizontal_line() {
        let mut surface = Surface::new(100, 40);
        draw_segment(&mut surface, 10, 10, 50, 10, &red(5));

        for x in 10..=50 {
            for y in 8..=12 {
                assert_eq!(surface.pixel(x, y), Some(Rgb::new(255, 0, 0)), "({x},{y})");
            }
            assert_eq!(surface.pixel(x, 7), Some(Rgb::WHITE));
            assert_eq!(surface.pixel(x, 13), Some(Rgb::WHITE));
        }
        // Round caps extend past the endpoints.
        assert_eq!(surface.pixel(8, 10), Some(Rgb::new(255, 0, 0)));
        assert_eq!(surface.pixel(52, 10), Some(Rgb::new(255, 0, 0)));
        assert_eq!(surface.pixel(53, 10), Some(Rgb::WHITE));
    }

    #[test]
    fn test_dot_when_endpoints_equal() {
        let mut surface = Surface::new(20, 20);
        draw_segment(&mut surface, 5, 5, 5, 5, &red(1));
        assert_eq!(surface.count(Rgb::new(255, 0, 0)), 1);
        assert_eq!(surface.pixel(5, 5), Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_drawing_twice_is_idempotent() {
        let mut once = Surface::new(64, 64);
        draw_segment(&mut once, 3, 7, 60, 41, &red(9));

        let mut twice = Surface::new(64, 64);
        draw_segment(&mut twice, 3, 7, 60, 41, &red(9));
        draw_segment(&mut twice, 3, 7, 60, 41, &red(9));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_eraser_restores_white() {
        let mut surface = Surface::new(30, 30);
        draw_segment(&mut surface, 0, 15, 29, 15, &red(3));
        let eraser = BrushSettings::new(Rgb::new(255, 0, 0), 3, Tool::Eraser);
        draw_segment(&mut surface, 0, 15, 29, 15, &eraser);
        assert_eq!(surface.count(Rgb::WHITE), 30 * 30);
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut surface = Surface::new(10, 10);
        draw_segment(&mut surface, -50, -50, -20, -20, &red(4));
        assert_eq!(surface.count(Rgb::WHITE), 100);

        draw_segment(&mut surface, -5, 5, 15, 5, &red(1));
        assert_eq!(surface.count(Rgb::new(255, 0, 0)), 10);
    }

    #[test]
    fn test_clear_surface() {
        let mut surface = Surface::new(10, 10);
        draw_segment(&mut surface, 0, 0, 9, 9, &red(3));
        clear_surface(&mut surface);
        assert_eq!(surface.count(Rgb::WHITE), 100);
    }
}
