use common_stdx::Point;

/// Where a marker lands on a scaled silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPlacement {
    /// Scaled body-part coordinate; the marker's visual center.
    pub center: Point<i32>,
    /// Top left cell of the marker image.
    pub top_left: Point<i32>,
}

/// Scale a base coordinate and anchor a `marker_size` square on its center.
pub fn place_marker(base: Point<i32>, scale: f32, marker_size: (u16, u16)) -> MarkerPlacement {
    let center = Point::new(
        (base.x as f32 * scale).round() as i32,
        (base.y as f32 * scale).round() as i32,
    );
    let half = Point::new(marker_size.0 as i32 / 2, marker_size.1 as i32 / 2);
    MarkerPlacement {
        center,
        top_left: center - half,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_base_coordinate() {
        let p = place_marker(Point::new(10, 20), 2.0, (1, 1));
        assert_eq!(p.center, Point::new(20, 40));
        assert_eq!(p.top_left, Point::new(20, 40));
    }

    #[test]
    fn centers_larger_markers() {
        let p = place_marker(Point::new(10, 20), 2.0, (3, 3));
        assert_eq!(p.center, Point::new(20, 40));
        assert_eq!(p.top_left, Point::new(19, 39));
    }

    #[test]
    fn fractional_scale_rounds() {
        let p = place_marker(Point::new(3, 5), 1.5, (1, 1));
        // 4.5 rounds away from zero, 7.5 too
        assert_eq!(p.center, Point::new(5, 8));
    }
}
