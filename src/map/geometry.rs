use glam::DVec2;

/// Fill density for a country, by how much dot coverage it gets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillPattern {
    None,
    Sparse,
    Medium,
    Solid,
}

impl FillPattern {
    #[inline(always)]
    pub fn covers(self, x: i32, y: i32) -> bool {
        match self {
            FillPattern::None => false,
            FillPattern::Sparse => x % 2 == 0 && y % 4 == 0,
            FillPattern::Medium => (x + y) % 2 == 0,
            FillPattern::Solid => true,
        }
    }
}

/// Rasterize a line with Bresenham's algorithm, calling `plot` per pixel
pub fn draw_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Even-odd scanline fill of projected rings, clipped to `width` x `height`.
/// Rings are closed implicitly; holes come out naturally from even-odd.
pub fn fill_rings(
    rings: &[Vec<(i32, i32)>],
    width: i32,
    height: i32,
    pattern: FillPattern,
    mut plot: impl FnMut(i32, i32),
) {
    if pattern == FillPattern::None {
        return;
    }

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if min_y > max_y {
        return;
    }

    let mut crossings: Vec<i32> = Vec::new();
    for y in min_y.max(0)..=max_y.min(height - 1) {
        // Sample at the pixel center to avoid double-counting vertices
        let sy = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let (x0, y0) = ring[i];
                let (x1, y1) = ring[(i + 1) % n];
                let (fy0, fy1) = (y0 as f64, y1 as f64);
                if (fy0 <= sy) != (fy1 <= sy) {
                    let t = (sy - fy0) / (fy1 - fy0);
                    crossings.push((x0 as f64 + t * (x1 - x0) as f64).round() as i32);
                }
            }
        }
        crossings.sort_unstable();
        for pair in crossings.chunks_exact(2) {
            for x in pair[0].max(0)..pair[1].min(width) {
                if pattern.covers(x, y) {
                    plot(x, y);
                }
            }
        }
    }
}

/// Even-odd point-in-polygon test over all rings of a polygon
pub fn point_in_rings(point: DVec2, rings: &[Vec<DVec2>]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[i], ring[j]);
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// Axis-aligned bounds (min, max) of a set of rings
pub fn bounds(rings: &[Vec<DVec2>]) -> Option<(DVec2, DVec2)> {
    let mut points = rings.iter().flatten();
    let first = *points.next()?;
    Some(points.fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))))
}

/// Area-weighted centroid of the outer ring (shoelace), falling back to
/// the bounds center for degenerate rings
pub fn label_point(rings: &[Vec<DVec2>]) -> Option<DVec2> {
    let outer = rings.first()?;
    let n = outer.len();
    let mut area = 0.0;
    let mut c = DVec2::ZERO;
    for i in 0..n {
        let (a, b) = (outer[i], outer[(i + 1) % n]);
        let cross = a.perp_dot(b);
        area += cross;
        c += (a + b) * cross;
    }
    if area.abs() < f64::EPSILON {
        return bounds(rings).map(|(lo, hi)| (lo + hi) / 2.0);
    }
    Some(c / (3.0 * area))
}
