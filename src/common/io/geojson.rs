use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Value, json};

/// Convert a GeoJSON geometry object (Polygon or MultiPolygon) into a geo::MultiPolygon.
pub(crate) fn geometry_from_geojson(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Geometry has no coordinates array"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon_coords(coords)?])),
        Some("MultiPolygon") => Ok(MultiPolygon(coords.iter()
            .map(|poly| poly.as_array()
                .ok_or_else(|| anyhow!("[io::geojson] Invalid MultiPolygon member"))
                .and_then(|rings| parse_polygon_coords(rings)))
            .collect::<Result<Vec<_>>>()?)),
        Some(other) => bail!("[io::geojson] Unsupported geometry type {other:?}"),
        None => bail!("[io::geojson] Geometry has no type"),
    }
}

/// Convert a geo::MultiPolygon into a GeoJSON MultiPolygon geometry object.
pub(crate) fn geometry_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = mp.0.iter()
        .map(|polygon| std::iter::once(ring(polygon.exterior()))
            .chain(polygon.interiors().iter().map(ring))
            .collect())
        .collect();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// Parse polygon coordinates `[exterior, hole, hole, ...]`.
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring.as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Invalid linear ring"))
        .and_then(|coords| parse_ring_coords(coords)));

    let exterior = rings.next()
        .ok_or_else(|| anyhow!("[io::geojson] Polygon is missing its exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring `[[x, y], [x, y], ...]`, closing it if needed.
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| {
            let x = pair[0].as_f64().context("[io::geojson] Invalid coordinate: x must be a number")?;
            let y = pair[1].as_f64().context("[io::geojson] Invalid coordinate: y must be a number")?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;

    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }

    Ok(LineString(points))
}
