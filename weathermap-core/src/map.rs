//! Leaflet map document generation.
//!
//! Output follows folium's code-generation layout (`var map_<hex> = L.map(...)`,
//! `var lat_lng_popup_<hex> = L.popup()`, a `latLngPop` click handler), which
//! is what [`crate::patch`] expects to find.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::model::Coordinate;

const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";
const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <script src="%LEAFLET_JS%"></script>
    <link rel="stylesheet" href="%LEAFLET_CSS%"/>
    <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no" />
    <style>
        #%MAP% {
            position: relative;
            width: 100.0%;
            height: 100.0%;
            left: 0.0%;
            top: 0.0%;
        }
        .leaflet-container { font-size: 1rem; }
    </style>
    <style>html, body {width: 100%;height: 100%;margin: 0;padding: 0;}</style>
</head>
<body>
    <div class="folium-map" id="%MAP%" ></div>
</body>
<script>
    var %MAP% = L.map(
        "%MAP%",
        {
            center: [%LAT%, %LON%],
            crs: L.CRS.EPSG3857,
            zoom: %ZOOM%,
            zoomControl: true,
            preferCanvas: false,
        }
    );

    var %TILES% = L.tileLayer(
        "%TILE_URL%",
        {"attribution": "%TILE_ATTRIBUTION%", "detectRetina": false, "maxZoom": 19, "minZoom": 0, "noWrap": false, "opacity": 1, "subdomains": "abc", "tms": false}
    );
    %TILES%.addTo(%MAP%);

    var %POPUP% = L.popup();
    function latLngPop(e) {
        %POPUP%
            .setLatLng(e.latlng)
            .setContent("Latitude: " + e.latlng.lat.toFixed(4) +
                        "<br>Longitude: " + e.latlng.lng.toFixed(4))
            .openOn(%MAP%);
    }
    %MAP%.on('click', latLngPop);
</script>
</html>
"#;

/// A rendered map document and the element names generated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    pub map_name: String,
    pub popup_name: String,
    pub html: String,
}

fn element_name(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

/// Render a map centered on `center` with a coordinate popup on click.
pub fn render(center: Coordinate, zoom: u8) -> MapDocument {
    let map_name = element_name("map_");
    let popup_name = element_name("lat_lng_popup_");
    let tiles_name = element_name("tile_layer_");

    let html = TEMPLATE
        .replace("%LEAFLET_JS%", LEAFLET_JS)
        .replace("%LEAFLET_CSS%", LEAFLET_CSS)
        .replace("%TILE_URL%", TILE_URL)
        .replace("%TILE_ATTRIBUTION%", &TILE_ATTRIBUTION.replace('"', "\\\""))
        .replace("%TILES%", &tiles_name)
        .replace("%POPUP%", &popup_name)
        .replace("%MAP%", &map_name)
        .replace("%LAT%", &center.latitude.to_string())
        .replace("%LON%", &center.longitude.to_string())
        .replace("%ZOOM%", &zoom.to_string());

    MapDocument { map_name, popup_name, html }
}

/// Render a map and write it to `path`, replacing any previous document.
pub fn write_map(path: &Path, center: Coordinate, zoom: u8) -> Result<MapDocument> {
    let document = render(center, zoom);

    fs::write(path, &document.html)
        .with_context(|| format!("Failed to write map document: {}", path.display()))?;

    info!(path = %path.display(), map = %document.map_name, "map document written");
    Ok(document)
}
