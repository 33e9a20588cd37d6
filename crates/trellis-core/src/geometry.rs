//! Geometric primitives shared by the entity model and the result mapper.
//!
//! # Coordinate System
//!
//! Layout engines report geometry in a top-left-origin system with Y growing
//! downward. The diagram convention is the complement: after a render, every
//! stored point has had `y` replaced by `canvas_height - y`. The types here
//! are convention-agnostic; the correction is applied by the result mapper.

/// A 2D point in either engine or diagram coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate.
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate.
    pub fn y(self) -> f32 {
        self.y
    }

    /// Returns this point shifted by `(dx, dy)`.
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Width and height dimensions, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width.
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height.
    pub fn height(self) -> f32 {
        self.height
    }

    /// Checks whether either dimension is zero.
    pub fn is_degenerate(self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Returns the componentwise minimum corner over a non-empty point list.
pub fn min_corner(points: &[Point]) -> Option<Point> {
    points.iter().copied().reduce(|acc, p| {
        Point::new(acc.x().min(p.x()), acc.y().min(p.y()))
    })
}

/// Returns the componentwise maximum corner over a non-empty point list.
pub fn max_corner(points: &[Point]) -> Option<Point> {
    points.iter().copied().reduce(|acc, p| {
        Point::new(acc.x().max(p.x()), acc.y().max(p.y()))
    })
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_translate() {
        let p = Point::new(10.0, 20.0).translate(5.0, -2.5);
        assert_approx_eq!(f32, p.x(), 15.0);
        assert_approx_eq!(f32, p.y(), 17.5);
    }

    #[test]
    fn test_min_max_corner() {
        let points = vec![
            Point::new(4.0, 9.0),
            Point::new(1.0, 12.0),
            Point::new(7.0, 3.0),
        ];
        assert_eq!(min_corner(&points), Some(Point::new(1.0, 3.0)));
        assert_eq!(max_corner(&points), Some(Point::new(7.0, 12.0)));
    }

    #[test]
    fn test_corner_of_empty_list() {
        assert_eq!(min_corner(&[]), None);
        assert_eq!(max_corner(&[]), None);
    }

    #[test]
    fn test_degenerate_size() {
        assert!(Size::new(0.0, 12.0).is_degenerate());
        assert!(Size::new(30.0, 0.0).is_degenerate());
        assert!(!Size::new(30.0, 12.0).is_degenerate());
    }
}
