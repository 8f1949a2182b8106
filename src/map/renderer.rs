use crate::braille::BrailleCanvas;
use crate::data::{CountryShape, Polygon};
use crate::map::geometry::{self, draw_line, fill_rings, FillPattern};
use crate::map::projection::{mercator, Viewport};
use crate::map::spatial::FeatureGrid;
use glam::DVec2;
use rayon::prelude::*;
use std::collections::HashMap;

/// Natural Earth resolution tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lod {
    Low,    // 1:110m
    Medium, // 1:50m
    High,   // 1:10m
}

impl Lod {
    /// Finer shapes as the view zooms in
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 4.0 {
            Lod::Low
        } else if zoom < 12.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Number of severity shades. Each has its own color layer.
pub const SHADES: usize = 4;

/// Fill density for a shade, lightest first
pub fn fill_for(shade: usize) -> FillPattern {
    match shade {
        0 => FillPattern::None,
        1 => FillPattern::Sparse,
        2 => FillPattern::Medium,
        _ => FillPattern::Solid,
    }
}

/// User toggles for the map pane
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_fill: bool,
    pub show_unknown: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_fill: true,
            show_unknown: true,
            show_labels: true,
        }
    }
}

/// A country shape with its Mercator projection precomputed
struct PreparedShape {
    code: String,
    name: String,
    polygons: Vec<Polygon>,
    mercator: Vec<Vec<Vec<DVec2>>>,
    label_at: Option<DVec2>,
}

struct ShapeLayer {
    lod: Lod,
    shapes: Vec<PreparedShape>,
    grid: FeatureGrid,
}

/// Rendered canvases, one per color, back to front
pub struct MapLayers {
    pub unknown: BrailleCanvas,
    /// Indexed by shade, lightest first
    pub shades: [BrailleCanvas; SHADES],
    pub selected: BrailleCanvas,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

impl MapLayers {
    fn new(width: usize, height: usize) -> Self {
        let blank = BrailleCanvas::new(width, height);
        Self {
            unknown: blank.clone(),
            shades: std::array::from_fn(|_| blank.clone()),
            selected: blank,
            labels: Vec::new(),
        }
    }
}

/// Pixels produced for one visible shape
struct Raster {
    shade: Option<usize>,
    selected: bool,
    outline: Vec<(i32, i32)>,
    fill: Vec<(i32, i32)>,
    label: Option<(u16, u16, String)>,
}

/// Choropleth renderer over multi-resolution country shapes
pub struct MapRenderer {
    layers: Vec<ShapeLayer>,
    pub settings: DisplaySettings,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Add (or replace) the shapes for one level of detail
    pub fn add_countries(&mut self, lod: Lod, shapes: Vec<CountryShape>) {
        let shapes: Vec<PreparedShape> = shapes
            .into_par_iter()
            .map(|shape| PreparedShape {
                mercator: shape
                    .polygons
                    .iter()
                    .map(|rings| {
                        rings
                            .iter()
                            .map(|ring| ring.iter().map(|p| mercator(p.x, p.y)).collect())
                            .collect()
                    })
                    .collect(),
                label_at: largest_polygon(&shape.polygons).and_then(geometry::label_point),
                code: shape.code,
                name: shape.name,
                polygons: shape.polygons,
            })
            .collect();

        let bboxes: Vec<(f64, f64, f64, f64)> = shapes
            .iter()
            .map(|s| {
                s.polygons
                    .iter()
                    .filter_map(|p| geometry::bounds(p))
                    .fold(
                        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
                        |acc, (lo, hi)| (acc.0.min(lo.x), acc.1.min(lo.y), acc.2.max(hi.x), acc.3.max(hi.y)),
                    )
            })
            .collect();
        let grid = FeatureGrid::build(bboxes.into_iter(), 5.0);

        self.layers.retain(|l| l.lod != lod);
        self.layers.push(ShapeLayer { lod, shapes, grid });
        self.layers.sort_by_key(|l| l.lod);
    }

    pub fn has_data(&self) -> bool {
        self.layers.iter().any(|l| !l.shapes.is_empty())
    }

    /// Best available layer for a zoom level: exact LOD, else the finest
    /// coarser one, else whatever exists
    fn layer_for(&self, zoom: f64) -> Option<&ShapeLayer> {
        let wanted = Lod::from_zoom(zoom);
        self.layers
            .iter()
            .rev()
            .find(|l| l.lod <= wanted)
            .or_else(|| self.layers.first())
    }

    /// LOD actually used at this zoom
    pub fn active_lod(&self, zoom: f64) -> Option<Lod> {
        self.layer_for(zoom).map(|l| l.lod)
    }

    /// Display name for a country code, if a shape exists for it
    pub fn country_name(&self, code: &str) -> Option<&str> {
        self.layers
            .iter()
            .flat_map(|l| l.shapes.iter())
            .find(|s| s.code == code)
            .map(|s| s.name.as_str())
    }

    /// Country code under a geographic point
    pub fn hit_test(&self, lon: f64, lat: f64, zoom: f64) -> Option<&str> {
        let layer = self.layer_for(zoom)?;
        let point = DVec2::new(lon, lat);
        layer
            .grid
            .query_point(lon, lat)
            .iter()
            .filter_map(|&idx| layer.shapes.get(idx))
            .find(|shape| shape.polygons.iter().any(|p| geometry::point_in_rings(point, p)))
            .map(|shape| shape.code.as_str())
    }

    /// Render all countries, each in the layer of its shade. Countries
    /// missing from `shades` go to the unknown layer.
    /// `width`/`height` are in character cells.
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        shades: &HashMap<&str, usize>,
        selected: Option<&str>,
    ) -> MapLayers {
        let mut layers = MapLayers::new(width, height);
        let Some(layer) = self.layer_for(viewport.zoom) else {
            return layers;
        };

        let rasters: Vec<Raster> = layer
            .shapes
            .par_iter()
            .filter_map(|shape| {
                let shade = shades.get(shape.code.as_str()).map(|&s| s.min(SHADES - 1));
                if shade.is_none() && !self.settings.show_unknown {
                    return None;
                }
                self.rasterize(shape, shade, selected == Some(shape.code.as_str()), viewport)
            })
            .collect();

        for raster in rasters {
            let canvas = match raster.shade {
                Some(s) => &mut layers.shades[s],
                None => &mut layers.unknown,
            };
            for &(x, y) in &raster.fill {
                canvas.set_pixel_signed(x, y);
            }
            let outline_canvas = if raster.selected {
                &mut layers.selected
            } else {
                canvas
            };
            for &(x, y) in &raster.outline {
                outline_canvas.set_pixel_signed(x, y);
            }
            if let Some(label) = raster.label {
                layers.labels.push(label);
            }
        }

        layers
    }

    fn rasterize(
        &self,
        shape: &PreparedShape,
        shade: Option<usize>,
        selected: bool,
        viewport: &Viewport,
    ) -> Option<Raster> {
        let (w, h) = (viewport.width as i32, viewport.height as i32);
        // Segments longer than half the projected world wrap the antimeridian
        let max_jump = (viewport.zoom * viewport.width as f64 * 0.5) as i32;

        let mut outline = Vec::new();
        let mut fill = Vec::new();
        let mut any_visible = false;

        for polygon in &shape.mercator {
            let rings: Vec<Vec<(i32, i32)>> = polygon
                .iter()
                .map(|ring| ring.iter().map(|&m| viewport.project_mercator(m)).collect())
                .collect();

            let Some(outer) = rings.first() else { continue };
            let (min, max) = outer.iter().fold(
                ((i32::MAX, i32::MAX), (i32::MIN, i32::MIN)),
                |(lo, hi), &(x, y)| ((lo.0.min(x), lo.1.min(y)), (hi.0.max(x), hi.1.max(y))),
            );
            if !viewport.bbox_visible(min, max) {
                continue;
            }
            any_visible = true;

            for ring in &rings {
                for pair in ring.windows(2) {
                    let (p1, p2) = (pair[0], pair[1]);
                    if (p1.0 - p2.0).abs() > max_jump || !viewport.line_might_be_visible(p1, p2) {
                        continue;
                    }
                    draw_line(p1.0, p1.1, p2.0, p2.1, |x, y| {
                        if x >= 0 && y >= 0 && x < w && y < h {
                            outline.push((x, y));
                        }
                    });
                }
            }

            if self.settings.show_fill && (max.0 - min.0) <= max_jump {
                if let Some(shade) = shade {
                    fill_rings(&rings, w, h, fill_for(shade), |x, y| fill.push((x, y)));
                }
            }
        }

        if !any_visible {
            return None;
        }

        let label = if self.settings.show_labels && shade.is_some() && viewport.zoom >= 2.0 {
            shape.label_at.and_then(|p| {
                let (px, py) = viewport.project(p.x, p.y);
                if px >= 0 && py >= 0 && px < w && py < h {
                    let col = (px / 2) as u16;
                    Some((col.saturating_sub(1), (py / 4) as u16, shape.code.clone()))
                } else {
                    None
                }
            })
        } else {
            None
        };

        Some(Raster {
            shade,
            selected,
            outline,
            fill,
            label,
        })
    }
}

/// The polygon with the most outer-ring vertices, a cheap proxy for the
/// mainland when placing labels
fn largest_polygon(polygons: &[Polygon]) -> Option<&[Vec<DVec2>]> {
    polygons
        .iter()
        .max_by_key(|p| p.first().map_or(0, Vec::len))
        .map(Vec::as_slice)
}
