//! Country outlines from Natural Earth admin-0 GeoJSON

use crate::map::Lod;
use geojson::{Feature, GeoJson, Geometry, Value};
use glam::DVec2;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ShapeLoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid GeoJSON in {}: {source}", .path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },
}

/// One polygon of a country: outer ring first, then holes
pub type Polygon = Vec<Vec<DVec2>>;

/// A country outline keyed by its ISO-3166 alpha-3 code
#[derive(Clone, Debug)]
pub struct CountryShape {
    pub code: String,
    pub name: String,
    pub polygons: Vec<Polygon>,
}

/// Country files per level of detail, coarsest first
const COUNTRY_FILES: [(&str, Lod); 3] = [
    ("ne_110m_admin_0_countries.json", Lod::Low),
    ("ne_50m_admin_0_countries.json", Lod::Medium),
    ("ne_10m_admin_0_countries.json", Lod::High),
];

/// Load every available country file in `data_dir`. Missing or broken
/// files are skipped with a warning; the map just has less detail.
pub fn load_all_countries(data_dir: &Path) -> Vec<(Lod, Vec<CountryShape>)> {
    let mut loaded = Vec::new();
    for (filename, lod) in COUNTRY_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match load_countries(&path) {
            Ok(shapes) => {
                info!("Loaded {} country shapes from {:?}", shapes.len(), path);
                loaded.push((lod, shapes));
            }
            Err(e) => warn!("Skipping {}: {}", filename, e),
        }
    }
    loaded
}

/// Load country polygons from a GeoJSON file
pub fn load_countries(path: &Path) -> Result<Vec<CountryShape>, ShapeLoadError> {
    let content = fs::read_to_string(path).map_err(|source| ShapeLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson = content.parse().map_err(|source| ShapeLoadError::GeoJson {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(countries_from_geojson(&geojson))
}

/// Extract country shapes from parsed GeoJSON. Features without a usable
/// code or polygon geometry are skipped.
pub fn countries_from_geojson(geojson: &GeoJson) -> Vec<CountryShape> {
    let features: Vec<&Feature> = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features.iter().collect(),
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => Vec::new(),
    };

    features
        .into_iter()
        .filter_map(|feature| {
            let code = country_code(feature)?;
            let name = string_property(feature, &["NAME", "ADMIN", "name"])
                .unwrap_or_else(|| code.clone());
            let mut polygons = Vec::new();
            if let Some(geometry) = &feature.geometry {
                collect_polygons(geometry, &mut polygons);
            }
            if polygons.is_empty() {
                return None;
            }
            Some(CountryShape { code, name, polygons })
        })
        .collect()
}

/// ISO alpha-3 code. Natural Earth marks some countries (France, Norway)
/// with "-99" in ISO_A3 and keeps the real code in ADM0_A3.
fn country_code(feature: &Feature) -> Option<String> {
    ["ISO_A3", "ADM0_A3", "iso_a3", "id"]
        .iter()
        .filter_map(|key| string_property(feature, &[*key]))
        .find(|code| code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|code| code.to_ascii_uppercase())
}

fn string_property(feature: &Feature, keys: &[&str]) -> Option<String> {
    let props = feature.properties.as_ref()?;
    keys.iter()
        .filter_map(|key| props.get(*key))
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .next()
}

fn collect_polygons(geometry: &Geometry, polygons: &mut Vec<Polygon>) {
    let to_ring = |coords: &Vec<Vec<f64>>| -> Vec<DVec2> {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| DVec2::new(c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::Polygon(rings) => {
            polygons.push(rings.iter().map(to_ring).collect());
        }
        Value::MultiPolygon(parts) => {
            for rings in parts {
                polygons.push(rings.iter().map(to_ring).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, polygons);
            }
        }
        _ => {}
    }
}
