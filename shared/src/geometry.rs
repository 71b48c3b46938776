//! Geometry utilities for field polygons
//!
//! Fields are drawn as single-ring polygons in geographic coordinates.
//! The helpers here convert between vertex lists and GeoJSON, compute
//! geodesic areas in hectares, and extract bounding boxes for tile and
//! preview requests.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};

/// Mean Earth radius in meters, used for spherical area computation.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A single polygon vertex as (latitude, longitude) in degrees.
pub type LatLng = (f64, f64);

/// Geographic bounding box in (min_lng, min_lat, max_lng, max_lat) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Grow the box by a fixed margin in degrees on every side, so a
    /// rendered preview is not clipped to the field's exact edge.
    pub fn padded(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min_lng: self.min_lng - margin,
            min_lat: self.min_lat - margin,
            max_lng: self.max_lng + margin,
            max_lat: self.max_lat + margin,
        }
    }

    /// Render as the `minLng,minLat,maxLng,maxLat` path segment expected
    /// by the raster service.
    pub fn to_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lng, self.min_lat, self.max_lng, self.max_lat
        )
    }
}

/// Compute the geodesic area of a closed ring in hectares.
///
/// Uses the spherical-excess ring-area method (Chamberlain & Duquette) on
/// a sphere of mean Earth radius. The result is non-negative and does not
/// depend on ring winding order. Rings with fewer than 3 distinct vertices
/// have zero area.
pub fn ring_area_ha(ring: &[LatLng]) -> f64 {
    // Drop the closing vertex if the ring repeats its first point.
    let ring = match ring.split_last() {
        Some((last, rest)) if !rest.is_empty() && *last == rest[0] => &ring[..ring.len() - 1],
        _ => ring,
    };

    let mut distinct: Vec<LatLng> = Vec::with_capacity(ring.len());
    for v in ring {
        if !distinct.contains(v) {
            distinct.push(*v);
        }
    }
    if distinct.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let (lat1, lng1) = ring[i];
        let (lat2, lng2) = ring[(i + 1) % n];
        sum += (lng2 - lng1).to_radians()
            * (2.0 + lat1.to_radians().sin() + lat2.to_radians().sin());
    }

    let area_m2 = (sum * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs();
    area_m2 / 10_000.0
}

/// Round an area in hectares to 2 decimal places, half-up at the cent.
///
/// Fields are always stored with the rounded value; a saved `12.345`
/// reads back as `12.35`.
pub fn round_area_ha(area_ha: f64) -> Decimal {
    Decimal::from_f64(area_ha.max(0.0))
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Wrap a (lat, lng) ring as a GeoJSON `Feature<Polygon>`.
///
/// Vertices are emitted in GeoJSON [lng, lat] order and the ring is closed
/// by repeating the first vertex when the input does not already close it.
pub fn ring_to_feature(ring: &[LatLng]) -> Value {
    let mut coords: Vec<Value> = ring.iter().map(|(lat, lng)| json!([lng, lat])).collect();
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if first != last => {
            let first = first.clone();
            coords.push(first);
        }
        _ => {}
    }

    json!({
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [coords],
        },
    })
}

/// Compute the area in hectares of a GeoJSON geometry's outer ring.
///
/// Geometries without a usable ring (points, malformed shapes) have zero
/// area.
pub fn geometry_area_ha(geometry: &Value) -> f64 {
    let Some(ring) = geometry
        .get("coordinates")
        .and_then(|c| c.get(0))
        .and_then(Value::as_array)
    else {
        return 0.0;
    };

    let vertices: Vec<LatLng> = ring
        .iter()
        .filter_map(|v| {
            let lng = v.get(0).and_then(Value::as_f64)?;
            let lat = v.get(1).and_then(Value::as_f64)?;
            Some((lat, lng))
        })
        .collect();

    ring_area_ha(&vertices)
}

/// Extract the bounding box of a GeoJSON geometry's outer ring.
///
/// Fails soft: a malformed geometry or an empty ring yields `None`, and
/// callers must treat that as "no bbox available".
pub fn bounding_box(geometry: &Value) -> Option<BoundingBox> {
    let ring = geometry.get("coordinates")?.get(0)?.as_array()?;

    let mut bbox = BoundingBox {
        min_lng: 180.0,
        min_lat: 90.0,
        max_lng: -180.0,
        max_lat: -90.0,
    };
    let mut seen = false;
    for vertex in ring {
        let lng = vertex.get(0).and_then(Value::as_f64);
        let lat = vertex.get(1).and_then(Value::as_f64);
        if let (Some(lng), Some(lat)) = (lng, lat) {
            bbox.min_lng = bbox.min_lng.min(lng);
            bbox.max_lng = bbox.max_lng.max(lng);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
            seen = true;
        }
    }

    seen.then_some(bbox)
}
