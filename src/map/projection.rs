use glam::DVec2;
use std::f64::consts::PI;

/// Web Mercator is undefined at the poles; clamp to its usual limit
const MAX_LAT: f64 = 85.0511;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 60.0;

/// Normalized Web Mercator coordinates in [0, 1] x [0, 1]
#[inline(always)]
pub fn mercator(lon: f64, lat: f64) -> DVec2 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    DVec2::new(
        (lon + 180.0) / 360.0,
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0,
    )
}

/// Inverse of [`mercator`], returning (lon, lat)
#[inline(always)]
pub fn inverse_mercator(p: DVec2) -> (f64, f64) {
    let lon = p.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * p.y)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Map camera: geographic center, zoom and canvas size in braille pixels
#[derive(Clone, Debug)]
pub struct Viewport {
    pub center_lon: f64,
    pub center_lat: f64,
    /// Zoom level (1.0 = whole world across the canvas width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Whole world
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Africa and the Middle East, where most forecast countries are
    pub fn africa(width: usize, height: usize) -> Self {
        Self::new(25.0, 5.0, 3.0, width, height)
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    fn center(&self) -> DVec2 {
        mercator(self.center_lon, self.center_lat)
    }

    /// Shift the center by a pixel offset
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let shifted = self.center() + DVec2::new(dx as f64, dy as f64) / self.scale();
        let (lon, lat) = inverse_mercator(shifted);

        self.center_lon = if lon > 180.0 {
            lon - 360.0
        } else if lon < -180.0 {
            lon + 360.0
        } else {
            lon
        };
        self.center_lat = lat.clamp(-80.0, 80.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom keeping the geographic point under (px, py) in place
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Pixel coordinates back to (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let offset = DVec2::new(
            px as f64 - self.width as f64 / 2.0,
            py as f64 - self.height as f64 / 2.0,
        );
        inverse_mercator(self.center() + offset / self.scale())
    }

    /// Geographic (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        self.project_mercator(mercator(lon, lat))
    }

    /// Pixel coordinates of an already projected Mercator point
    #[inline(always)]
    pub fn project_mercator(&self, m: DVec2) -> (i32, i32) {
        let p = (m - self.center()) * self.scale()
            + DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        (p.x as i32, p.y as i32)
    }

    /// Cheap reject for segments wholly off one side of the canvas
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Whether a pixel-space box overlaps the canvas
    pub fn bbox_visible(&self, min: (i32, i32), max: (i32, i32)) -> bool {
        self.line_might_be_visible(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::africa(200, 120);
        let (px, py) = vp.project(30.0, 15.0);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 30.0).abs() < 0.5);
        assert!((lat - 15.0).abs() < 0.5);
    }

    #[test]
    fn test_poles_stay_finite() {
        let vp = Viewport::world(100, 100);
        let (_, y) = vp.project(0.0, -90.0);
        assert!(y > 0);
        assert!(mercator(0.0, 90.0).y.is_finite());
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, 10);
        assert!(vp.center_lat < 0.0);
    }

    #[test]
    fn test_zoom_limits() {
        let mut vp = Viewport::world(100, 100);
        for _ in 0..50 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..50 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_at_keeps_point_under_cursor() {
        let mut vp = Viewport::africa(200, 120);
        let before = vp.unproject(150, 30);
        vp.zoom_in_at(150, 30);
        let after = vp.unproject(150, 30);
        assert!((before.0 - after.0).abs() < 1.0);
        assert!((before.1 - after.1).abs() < 1.0);
    }
}
