//! Standalone Leaflet HTML output for a composed map.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::common::write_atomic;
use crate::render::{MapArtifact, MapFrame, MISSING};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

/// Tile URL and attribution of a named base layer.
fn tile_layer(name: &str) -> (&'static str, &'static str) {
    match name.to_lowercase().as_str() {
        "openstreetmap" => (
            "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            "&copy; OpenStreetMap contributors",
        ),
        _ => (
            "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            "&copy; OpenStreetMap contributors &copy; CARTO",
        ),
    }
}

/// Escape text for HTML element content and attribute values.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON safe to inline in a <script> element.
fn script_json(value: &Value) -> Result<String> {
    let s = serde_json::to_string(value).context("[render::html] Failed to serialize JSON")?;
    Ok(s.replace("</", "<\\/"))
}

fn tooltip_html(rows: &[(String, String)]) -> String {
    let mut html = String::from("<table class=\"frgeostat-tooltip\">");
    for (label, text) in rows {
        html.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>", escape_html(label), escape_html(text)));
    }
    html.push_str("</table>");
    html
}

fn popup_html(url: &str) -> String {
    format!("<a href=\"{}\"><h4>Go to Zone</h4></a>", escape_html(url))
}

fn map_options(frame: &MapFrame) -> Value {
    let mut options = json!({
        "center": frame.center,
        "zoom": frame.zoom,
        "minZoom": frame.min_zoom,
    });
    if let Some(b) = frame.max_bounds {
        options["maxBounds"] = json!([[b.min().y, b.min().x], [b.max().y, b.max().x]]);
    }
    options
}

/// Write the whole HTML document to any writer.
pub fn write_map_html<W: Write>(writer: &mut W, map: &MapArtifact) -> Result<()> {
    let layer = &map.choropleth;
    let (tiles, attribution) = tile_layer(&map.frame.tiles);

    let fills: serde_json::Map<String, Value> = layer.fills().into_iter()
        .map(|(key, color)| (key, Value::String(color.to_string())))
        .collect();
    let overlays: Vec<Value> = map.tooltips.iter()
        .map(|t| json!({
            "geojson": t.feature.to_geojson(),
            "tooltip": tooltip_html(&t.rows),
            "popup": t.popup.as_deref().map(popup_html),
        }))
        .collect();
    let legend: Vec<Value> = layer.scale.as_ref()
        .map(|scale| {
            let breaks = scale.breaks();
            scale.colors().iter().enumerate()
                .map(|(i, c)| json!([c.to_string(), format!("{:.1} – {:.1}", breaks[i], breaks[i + 1])]))
                .collect()
        })
        .unwrap_or_default();

    writeln!(writer, r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
<title>{title}</title>
<link rel="stylesheet" href="{LEAFLET_CSS}"/>
<script src="{LEAFLET_JS}"></script>
<style>
    html, body, #map {{ height: 100%; width: 100%; margin: 0; padding: 0; }}
    .frgeostat-tooltip th {{ text-align: left; padding-right: 8px; vertical-align: top; }}
    .frgeostat-tooltip td {{ white-space: pre-line; }}
    .frgeostat-legend {{ background: #ffffff; padding: 6px 8px; font: 12px sans-serif; line-height: 18px; }}
    .frgeostat-legend i {{ width: 18px; height: 18px; float: left; margin-right: 6px; opacity: {fill_opacity}; }}
</style>
</head>
<body>
<div id="map"></div>"##,
        title = escape_html(&map.title),
        fill_opacity = layer.fill_opacity,
    )?;

    writeln!(writer, "<script>")?;
    writeln!(writer, "const map = L.map('map', {});", script_json(&map_options(&map.frame))?)?;
    writeln!(writer, "L.tileLayer({}, {{ attribution: {}, subdomains: 'abcd', maxZoom: 20 }}).addTo(map);",
        script_json(&json!(tiles))?, script_json(&json!(attribution))?)?;

    writeln!(writer, "const fills = {};", script_json(&Value::Object(fills))?)?;
    writeln!(writer, "const choropleth = L.geoJSON({}, {{", script_json(&layer.geometry.to_geojson())?)?;
    writeln!(writer, "    style: f => ({{ fillColor: fills[String({})] ?? {}, fillOpacity: {}, color: 'black', weight: 1, opacity: {} }})",
        layer.key_on.js_accessor(), script_json(&json!(MISSING.to_string()))?, layer.fill_opacity, layer.line_opacity)?;
    writeln!(writer, "}}).addTo(map);")?;

    writeln!(writer, "const tooltips = L.featureGroup().addTo(map);")?;
    writeln!(writer, "for (const o of {}) {{", script_json(&Value::Array(overlays))?)?;
    writeln!(writer, r#"    const l = L.geoJSON(o.geojson, {{ style: {{ fillColor: '#00000000', color: '#00000000', opacity: 0.01, weight: 0.01 }} }});
    l.bindTooltip(o.tooltip, {{ sticky: true }});
    if (o.popup) l.bindPopup(o.popup);
    l.addTo(tooltips);
}}
tooltips.bringToFront();
map.on('overlayadd', () => tooltips.bringToFront());"#)?;

    writeln!(writer, "L.control.layers(null, {{ {}: choropleth, \"tooltips\": tooltips }}).addTo(map);",
        script_json(&json!(layer.name))?)?;

    writeln!(writer, r#"const legend = L.control({{ position: 'topright' }});
legend.onAdd = () => {{
    const div = L.DomUtil.create('div', 'frgeostat-legend');
    div.innerHTML = '<b>' + {} + '</b><br/>' + {}.map(([c, r]) => '<i style="background:' + c + '"></i>' + r).join('<br/>');
    return div;
}};
legend.addTo(map);"#,
        script_json(&json!(escape_html(&layer.legend)))?, script_json(&json!(legend))?)?;

    writeln!(writer, "</script>\n</body>\n</html>")?;
    Ok(())
}

impl MapArtifact {
    /// Render the map as a standalone HTML document.
    pub fn to_html(&self) -> Result<String> {
        let mut buffer = Vec::new();
        write_map_html(&mut buffer, self)?;
        String::from_utf8(buffer).context("[render::html] HTML output is not valid UTF-8")
    }

    /// Render and atomically write the map to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let html = self.to_html()?;
        write_atomic(path, html.as_bytes())
            .with_context(|| format!("[MapArtifact::save] Failed to write {}", path.display()))
    }
}
