//! Random coordinate sampling inside locality boundaries
//!
//! Loads a GeoJSON feature collection of locality polygons and produces
//! uniformly distributed points inside a named locality via rejection
//! sampling over the polygon's bounding box.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use geo::{BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Cap on rejection-sampling draws per point. A simple-connected district
/// polygon needs a handful of draws; hitting the cap means the geometry is
/// degenerate (for example zero area).
pub const MAX_SAMPLE_ATTEMPTS: usize = 10_000;

/// Errors raised while loading the boundary file. These are fatal: no
/// records are generated against a broken boundary source.
#[derive(Debug)]
pub enum BoundaryError {
    /// Boundary file missing or unreadable
    Io(io::Error),
    /// The file is not a valid GeoJSON feature collection
    Json(serde_json::Error),
    /// Structurally valid JSON but unusable content
    Malformed(String),
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryError::Io(e) => write!(f, "could not read boundary file: {}", e),
            BoundaryError::Json(e) => write!(f, "could not parse boundary file: {}", e),
            BoundaryError::Malformed(msg) => write!(f, "malformed boundary data: {}", msg),
        }
    }
}

impl std::error::Error for BoundaryError {}

impl From<io::Error> for BoundaryError {
    fn from(e: io::Error) -> Self {
        BoundaryError::Io(e)
    }
}

impl From<serde_json::Error> for BoundaryError {
    fn from(e: serde_json::Error) -> Self {
        BoundaryError::Json(e)
    }
}

/// Per-point sampling failures.
#[derive(Debug)]
pub enum SampleError {
    /// No feature with the requested name. Soft at the call site: the
    /// affected record is left without coordinates.
    RegionNotFound(String),
    /// The rejection-sampling cap was exhausted without landing inside
    /// the polygon.
    Timeout { region: String, attempts: usize },
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::RegionNotFound(name) => {
                write!(f, "locality '{}' not found in boundary data", name)
            }
            SampleError::Timeout { region, attempts } => write!(
                f,
                "no point found inside locality '{}' after {} attempts",
                region, attempts
            ),
        }
    }
}

impl std::error::Error for SampleError {}

#[derive(serde::Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(serde::Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: FeatureGeometry,
}

#[derive(serde::Deserialize)]
struct FeatureProperties {
    #[serde(rename = "LocNombre")]
    name: String,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type")]
enum FeatureGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

fn ring_to_line_string(ring: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(ring.iter().map(|c| (c[0], c[1])).collect::<Vec<_>>())
}

fn rings_to_polygon(rings: &[Vec<[f64; 2]>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        ring_to_line_string(exterior),
        interiors.iter().map(|r| ring_to_line_string(r)).collect(),
    ))
}

impl FeatureGeometry {
    fn into_multi_polygon(self) -> Option<MultiPolygon<f64>> {
        match self {
            FeatureGeometry::Polygon { coordinates } => {
                rings_to_polygon(&coordinates).map(|p| MultiPolygon::new(vec![p]))
            }
            FeatureGeometry::MultiPolygon { coordinates } => {
                let polygons: Vec<Polygon<f64>> = coordinates
                    .iter()
                    .filter_map(|rings| rings_to_polygon(rings))
                    .collect();
                if polygons.is_empty() {
                    None
                } else {
                    Some(MultiPolygon::new(polygons))
                }
            }
        }
    }
}

/// Locality name → polygon lookup, loaded once from GeoJSON.
#[derive(Clone, Debug)]
pub struct LocalityBoundaries {
    regions: HashMap<String, MultiPolygon<f64>>,
}

impl LocalityBoundaries {
    /// Load boundaries from a GeoJSON file on disk.
    pub fn from_geojson_file(path: &Path) -> Result<Self, BoundaryError> {
        let content = fs::read_to_string(path)?;
        Self::from_geojson_str(&content)
    }

    /// Load boundaries from GeoJSON text. Feature names are matched
    /// exactly as stored, so the source is expected to carry uppercase
    /// locality names.
    pub fn from_geojson_str(content: &str) -> Result<Self, BoundaryError> {
        let collection: FeatureCollection = serde_json::from_str(content)?;
        let mut regions = HashMap::new();
        for feature in collection.features {
            let name = feature.properties.name;
            let polygon = feature.geometry.into_multi_polygon().ok_or_else(|| {
                BoundaryError::Malformed(format!("feature '{}' has no polygon rings", name))
            })?;
            regions.insert(name, polygon);
        }
        if regions.is_empty() {
            return Err(BoundaryError::Malformed(
                "feature collection contains no features".to_string(),
            ));
        }
        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains_region(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    /// Sample one uniform point strictly inside the named locality.
    ///
    /// Returns `(latitude, longitude)`. Draws uniform points in the
    /// polygon's bounding box and accepts the first one contained in the
    /// polygon; gives up with [`SampleError::Timeout`] after
    /// [`MAX_SAMPLE_ATTEMPTS`] rejected draws.
    pub fn sample_point(
        &self,
        region_name: &str,
        rng: &mut ChaCha8Rng,
    ) -> Result<(f64, f64), SampleError> {
        let region = self
            .regions
            .get(region_name)
            .ok_or_else(|| SampleError::RegionNotFound(region_name.to_string()))?;

        let rect = match region.bounding_rect() {
            Some(rect) => rect,
            None => {
                return Err(SampleError::Timeout {
                    region: region_name.to_string(),
                    attempts: 0,
                })
            }
        };

        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let x = rng.gen_range(rect.min().x..=rect.max().x);
            let y = rng.gen_range(rect.min().y..=rect.max().y);
            if region.contains(&Point::new(x, y)) {
                // GeoJSON stores (longitude, latitude)
                return Ok((y, x));
            }
        }

        Err(SampleError::Timeout {
            region: region_name.to_string(),
            attempts: MAX_SAMPLE_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn square_collection() -> String {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"LocNombre": "SUBA"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [-74.10, 4.70],
                            [-74.05, 4.70],
                            [-74.05, 4.76],
                            [-74.10, 4.76],
                            [-74.10, 4.70]
                        ]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"LocNombre": "BOSA"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[
                            [-74.20, 4.58],
                            [-74.16, 4.58],
                            [-74.16, 4.63],
                            [-74.20, 4.63],
                            [-74.20, 4.58]
                        ]]]
                    }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_sampled_points_fall_inside_polygon() {
        let boundaries = LocalityBoundaries::from_geojson_str(&square_collection()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let (lat, lon) = boundaries.sample_point("SUBA", &mut rng).unwrap();
            assert!((4.70..=4.76).contains(&lat));
            assert!((-74.10..=-74.05).contains(&lon));
        }
    }

    #[test]
    fn test_multi_polygon_features_are_sampled() {
        let boundaries = LocalityBoundaries::from_geojson_str(&square_collection()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let (lat, lon) = boundaries.sample_point("BOSA", &mut rng).unwrap();
        assert!((4.58..=4.63).contains(&lat));
        assert!((-74.20..=-74.16).contains(&lon));
    }

    #[test]
    fn test_unknown_region_is_reported() {
        let boundaries = LocalityBoundaries::from_geojson_str(&square_collection()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        match boundaries.sample_point("ATLANTIS", &mut rng) {
            Err(SampleError::RegionNotFound(name)) => assert_eq!(name, "ATLANTIS"),
            other => panic!("expected RegionNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_polygon_times_out() {
        // All vertices coincide: zero area, nothing is ever contained.
        let collection = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"LocNombre": "PUNTO"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-74.1, 4.6],
                        [-74.1, 4.6],
                        [-74.1, 4.6],
                        [-74.1, 4.6]
                    ]]
                }
            }]
        })
        .to_string();

        let boundaries = LocalityBoundaries::from_geojson_str(&collection).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        match boundaries.sample_point("PUNTO", &mut rng) {
            Err(SampleError::Timeout { region, .. }) => assert_eq!(region, "PUNTO"),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_geojson_is_fatal() {
        assert!(matches!(
            LocalityBoundaries::from_geojson_str("{not json"),
            Err(BoundaryError::Json(_))
        ));
        assert!(matches!(
            LocalityBoundaries::from_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#),
            Err(BoundaryError::Malformed(_))
        ));
    }
}
