//! Standalone Leaflet page rendering.
//!
//! The page is self-contained apart from the Leaflet scripts and the base
//! tiles, which load from public CDNs. All layer data is embedded as one
//! JSON object that a small inline script turns into Leaflet layers. The
//! [`LayerManifest`] is embedded separately in a
//! `<script type="application/json" id="layer-manifest">` element so tools
//! can read it back with [`extract_manifest`].

use serde::Serialize;

use madrid_map_aggregate::WeightedPoint;

use crate::{Layer, LayerManifest, MapDocument, Marker, RenderError, TimeHeatOptions};

const MANIFEST_OPEN: &str = r#"<script type="application/json" id="layer-manifest">"#;
const MANIFEST_CLOSE: &str = "</script>";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    center: [f64; 2],
    zoom: u8,
    tiles: TilesPayload<'a>,
    control_scale: bool,
    layer_control: bool,
    layers: Vec<LayerPayload<'a>>,
}

#[derive(Serialize)]
struct TilesPayload<'a> {
    name: &'a str,
    url: &'a str,
    attribution: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LayerPayload<'a> {
    HeatMapWithTime {
        name: &'a str,
        frames: Vec<Vec<[f64; 3]>>,
        index: &'a [String],
        options: TimeOptionsPayload,
    },
    HeatMap {
        name: &'a str,
        points: Vec<[f64; 3]>,
        radius: f64,
    },
    MarkerCluster {
        name: &'a str,
        markers: Vec<MarkerPayload<'a>>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeOptionsPayload {
    radius: f64,
    min_opacity: f64,
    max_opacity: f64,
    use_local_extrema: bool,
    auto_play: bool,
}

impl From<&TimeHeatOptions> for TimeOptionsPayload {
    fn from(options: &TimeHeatOptions) -> Self {
        Self {
            radius: options.radius,
            min_opacity: options.min_opacity,
            max_opacity: options.max_opacity,
            use_local_extrema: options.use_local_extrema,
            auto_play: options.auto_play,
        }
    }
}

#[derive(Serialize)]
struct MarkerPayload<'a> {
    lat: f64,
    lon: f64,
    color: &'a str,
    icon: &'a str,
    popup: &'a str,
}

impl<'a> From<&'a Marker> for MarkerPayload<'a> {
    fn from(marker: &'a Marker) -> Self {
        Self {
            lat: marker.latitude,
            lon: marker.longitude,
            color: &marker.color,
            icon: &marker.icon,
            popup: &marker.popup,
        }
    }
}

fn triples(points: &[WeightedPoint]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|p| [p.latitude, p.longitude, p.weight])
        .collect()
}

fn layer_payload(layer: &Layer) -> LayerPayload<'_> {
    match layer {
        Layer::TimeHeat(layer) => LayerPayload::HeatMapWithTime {
            name: layer.name(),
            frames: layer.frames().iter().map(|f| triples(f)).collect(),
            index: layer.index(),
            options: layer.options().into(),
        },
        Layer::Heat(layer) => LayerPayload::HeatMap {
            name: &layer.name,
            points: triples(&layer.points),
            radius: layer.radius,
        },
        Layer::Cluster(layer) => LayerPayload::MarkerCluster {
            name: &layer.name,
            markers: layer.markers.iter().map(MarkerPayload::from).collect(),
        },
    }
}

/// Serializes `value` for embedding inside a `<script>` element.
///
/// `<` only occurs inside JSON strings, where `\u003c` is equivalent, so no
/// string value can close the element early.
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Renders `document` as a standalone HTML page.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the layer data cannot be serialized.
pub fn render(document: &MapDocument) -> Result<String, serde_json::Error> {
    let options = document.options();
    let payload = Payload {
        center: options.center,
        zoom: options.zoom,
        tiles: TilesPayload {
            name: options.tiles.as_ref(),
            url: options.tiles.url(),
            attribution: options.tiles.attribution(),
        },
        control_scale: options.control_scale,
        layer_control: document.has_layer_control(),
        layers: document.layers().iter().map(layer_payload).collect(),
    };

    let html = PAGE_TEMPLATE
        .replace("{{TITLE}}", &escape_html(&options.title))
        .replace("{{MANIFEST}}", &script_json(&document.manifest())?)
        .replace("{{MAP_DATA}}", &script_json(&payload)?);

    log::debug!(
        "Rendered '{}' with {} layers ({} bytes)",
        options.title,
        document.layers().len(),
        html.len()
    );

    Ok(html)
}

/// Reads the layer manifest embedded in a rendered page.
///
/// # Errors
///
/// * [`RenderError::ManifestMissing`] if the page has no manifest element
/// * [`RenderError::Manifest`] if the manifest is not valid JSON
pub fn extract_manifest(html: &str) -> Result<LayerManifest, RenderError> {
    let start = html
        .find(MANIFEST_OPEN)
        .map(|i| i + MANIFEST_OPEN.len())
        .ok_or(RenderError::ManifestMissing)?;
    let len = html[start..]
        .find(MANIFEST_CLOSE)
        .ok_or(RenderError::ManifestMissing)?;

    Ok(serde_json::from_str(&html[start..start + len])?)
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="es">

<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{TITLE}}</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="">
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css">
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css">
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
  <link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css">
  <style>
    html,
    body {
      height: 100%;
      margin: 0;
    }

    #map {
      position: absolute;
      inset: 0;
    }

    .time-control {
      background: rgba(255, 255, 255, 0.9);
      border-radius: 4px;
      box-shadow: 0 1px 5px rgba(0, 0, 0, 0.4);
      font: 13px/1.4 "Helvetica Neue", Arial, sans-serif;
      padding: 6px 10px;
    }

    .time-control button {
      cursor: pointer;
      margin-right: 6px;
      min-width: 2.5em;
    }

    .time-control input {
      vertical-align: middle;
      width: 220px;
    }

    .time-control .time-label {
      display: inline-block;
      font-weight: bold;
      margin-left: 6px;
      min-width: 6em;
    }
  </style>
</head>

<body>
  <div id="map"></div>
  <script type="application/json" id="layer-manifest">{{MANIFEST}}</script>
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
  <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>
  <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
  <script>
    const MAP_DATA = {{MAP_DATA}};

    (function () {
      const map = L.map('map', { center: MAP_DATA.center, zoom: MAP_DATA.zoom });
      const base = L.tileLayer(MAP_DATA.tiles.url, {
        attribution: MAP_DATA.tiles.attribution,
        maxZoom: 19,
      }).addTo(map);
      if (MAP_DATA.controlScale) L.control.scale().addTo(map);

      const overlays = {};

      function maxWeight(points) {
        let max = 0;
        for (const p of points) {
          if (p[2] > max) max = p[2];
        }
        return max || 1;
      }

      function addTimeHeat(layer) {
        const opts = layer.options;
        const frames = layer.frames;
        const globalMax = frames.reduce(function (acc, f) { return Math.max(acc, maxWeight(f)); }, 1);
        const heat = L.heatLayer([], { radius: opts.radius, minOpacity: opts.minOpacity, max: globalMax });
        const control = L.control({ position: 'bottomleft' });
        let current = 0;
        let timer = null;
        let slider = null;
        let label = null;
        let button = null;

        function show(i) {
          current = i;
          const frame = frames[i] || [];
          heat.setOptions({ max: opts.useLocalExtrema ? maxWeight(frame) : globalMax });
          heat.setLatLngs(frame);
          if (slider) slider.value = String(i);
          if (label) label.textContent = layer.index[i] || '';
        }

        function stop() {
          if (timer) clearInterval(timer);
          timer = null;
          if (button) button.textContent = '\u25B6';
        }

        function play() {
          if (frames.length < 2 || timer) return;
          if (button) button.textContent = '\u275A\u275A';
          timer = setInterval(function () { show((current + 1) % frames.length); }, 1000);
        }

        control.onAdd = function () {
          const div = L.DomUtil.create('div', 'time-control');
          button = L.DomUtil.create('button', '', div);
          button.type = 'button';
          button.textContent = '\u25B6';
          slider = L.DomUtil.create('input', '', div);
          slider.type = 'range';
          slider.min = '0';
          slider.max = String(Math.max(0, frames.length - 1));
          slider.step = '1';
          slider.value = String(current);
          label = L.DomUtil.create('span', 'time-label', div);
          label.textContent = layer.index[current] || '';
          L.DomEvent.disableClickPropagation(div);
          slider.addEventListener('input', function () { stop(); show(Number(slider.value)); });
          button.addEventListener('click', function () { if (timer) { stop(); } else { play(); } });
          return div;
        };

        heat.on('add', function () {
          if (heat._canvas) heat._canvas.style.opacity = String(opts.maxOpacity);
          if (!control._map) control.addTo(map);
        });
        heat.on('remove', function () {
          stop();
          control.remove();
        });

        heat.addTo(map);
        show(0);
        if (opts.autoPlay) play();
        overlays[layer.name] = heat;
      }

      function addHeat(layer) {
        const heat = L.heatLayer(layer.points, { radius: layer.radius, max: maxWeight(layer.points) });
        overlays[layer.name] = heat.addTo(map);
      }

      function addCluster(layer) {
        const group = L.markerClusterGroup();
        for (const m of layer.markers) {
          const icon = L.AwesomeMarkers.icon({
            icon: m.icon,
            markerColor: m.color,
            prefix: 'glyphicon',
            iconColor: 'white',
          });
          const body = document.createElement('div');
          body.textContent = m.popup;
          L.marker([m.lat, m.lon], { icon: icon }).bindPopup(body).addTo(group);
        }
        overlays[layer.name] = group.addTo(map);
      }

      for (const layer of MAP_DATA.layers) {
        switch (layer.kind) {
          case 'heat_map_with_time':
            addTimeHeat(layer);
            break;
          case 'heat_map':
            addHeat(layer);
            break;
          case 'marker_cluster':
            addCluster(layer);
            break;
        }
      }

      if (MAP_DATA.layerControl) {
        const bases = {};
        bases[MAP_DATA.tiles.name] = base;
        L.control.layers(bases, overlays).addTo(map);
      }
    })();
  </script>
</body>

</html>
"#;
