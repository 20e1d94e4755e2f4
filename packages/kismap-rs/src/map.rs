//! Shapes access-point summaries into heatmap and marker layers and renders
//! them as a self-contained Leaflet page.

use crate::band::Band;
use crate::error::{KismapError, Result};
use crate::types::{AccessPointSummary, GeoPoint};
use serde::Serialize;
use std::collections::BTreeMap;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "heatmap.html";
const HEATMAP_TEMPLATE: &str = include_str!("templates/heatmap.html");

pub const DEFAULT_ZOOM: u8 = 18;

/// (lat, lon, weight) triple for the heat layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint(pub f64, pub f64, pub f64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayer {
    pub band: Band,
    pub name: String,
    pub points: Vec<HeatPoint>,
}

/// Clustered marker; `popup` and `tooltip` are already HTML-escaped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub footer: String,
}

pub fn default_tile_layers() -> Vec<TileLayer> {
    vec![
        TileLayer {
            name: "OpenStreetMap",
            url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            attribution: "&copy; OpenStreetMap contributors",
        },
        TileLayer {
            name: "Dark Mode",
            url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
            attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
        },
        TileLayer {
            name: "Light Mode",
            url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
        },
    ]
}

pub fn signal_legend() -> Legend {
    Legend {
        title: "WiFi Signal Heatmap".to_string(),
        entries: vec![
            LegendEntry { color: "red", label: "Excellent (>-40 dBm)" },
            LegendEntry { color: "orange", label: "Good (-40 to -60 dBm)" },
            LegendEntry { color: "yellow", label: "Fair (-60 to -75 dBm)" },
            LegendEntry { color: "green", label: "Weak (-75 to -85 dBm)" },
            LegendEntry { color: "blue", label: "Poor (<-85 dBm)" },
        ],
        footer: format!(
            "Generated by kismap on {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

/// Map `signal` linearly from `[min_signal, 0]` dBm onto `[0, 1]`.
pub fn signal_weight(signal: i32, min_signal: i32) -> f64 {
    if min_signal >= 0 {
        return 1.0;
    }
    let floor = min_signal as f64;
    ((signal as f64 - floor) / -floor).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    pub show_heatmap: bool,
    pub min_signal: i32,
}

/// Everything the renderer needs, in renderer-neutral form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDocument {
    pub title: String,
    pub center: GeoPoint,
    pub zoom: u8,
    pub tile_layers: Vec<TileLayer>,
    pub heat_layers: Vec<HeatLayer>,
    pub markers: Vec<Marker>,
    #[serde(skip)]
    pub legend: Legend,
}

impl MapDocument {
    /// Build the layers from summaries. Summaries without a fix are skipped;
    /// returns `None` when nothing is left to place on the map.
    pub fn from_summaries<'a, I>(summaries: I, options: &MapOptions) -> Option<MapDocument>
    where
        I: IntoIterator<Item = &'a AccessPointSummary>,
    {
        let mut markers = Vec::new();
        let mut heat: BTreeMap<Band, Vec<HeatPoint>> = BTreeMap::new();

        for summary in summaries {
            let Some(location) = summary.location else {
                continue;
            };
            markers.push(Marker {
                lat: location.lat,
                lon: location.lon,
                popup: popup_html(summary),
                tooltip: tera::escape_html(summary.display_ssid()),
            });
            if options.show_heatmap {
                heat.entry(summary.band).or_default().push(HeatPoint(
                    location.lat,
                    location.lon,
                    signal_weight(summary.best_signal, options.min_signal),
                ));
            }
        }

        if markers.is_empty() {
            return None;
        }

        let n = markers.len() as f64;
        let center = GeoPoint {
            lat: markers.iter().map(|m| m.lat).sum::<f64>() / n,
            lon: markers.iter().map(|m| m.lon).sum::<f64>() / n,
        };

        let heat_layers = heat
            .into_iter()
            .map(|(band, points)| HeatLayer {
                band,
                name: format!("Heatmap {} GHz ({} pts)", band, points.len()),
                points,
            })
            .collect();

        Some(MapDocument {
            title: "kismap - WiFi Heatmap".to_string(),
            center,
            zoom: DEFAULT_ZOOM,
            tile_layers: default_tile_layers(),
            heat_layers,
            markers,
            legend: signal_legend(),
        })
    }
}

fn popup_html(summary: &AccessPointSummary) -> String {
    format!(
        "<b>SSID:</b> {}<br><b>MAC:</b> {}<br><b>Signal:</b> {} dBm<br><b>Type:</b> {}\
         <br><b>Seen:</b> {} times<br><b>First seen:</b> {}<br><b>Last seen:</b> {}",
        tera::escape_html(summary.display_ssid()),
        tera::escape_html(&summary.mac),
        summary.best_signal,
        tera::escape_html(summary.device_type.as_deref().unwrap_or("Unknown")),
        summary.observation_count,
        seen_label(summary.first_seen_at()),
        seen_label(summary.last_seen_at()),
    )
}

fn seen_label(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Turns a [`MapDocument`] into a standalone document.
pub trait MapRenderer {
    fn render(&self, document: &MapDocument) -> Result<String>;
}

/// Leaflet + leaflet.heat + leaflet.markercluster page
pub struct LeafletRenderer {
    tera: Tera,
}

impl LeafletRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, HEATMAP_TEMPLATE)?;
        Ok(Self { tera })
    }
}

impl MapRenderer for LeafletRenderer {
    fn render(&self, document: &MapDocument) -> Result<String> {
        let data = serde_json::to_string(document)
            .map_err(|e| KismapError::Render(e.to_string()))?;
        // keep "</script>" in an SSID from closing the script element
        let data = data.replace("</", "<\\/");

        let mut context = Context::new();
        context.insert("title", &document.title);
        context.insert("legend", &document.legend);
        context.insert("data", &data);

        let html = self.tera.render(TEMPLATE_NAME, &context)?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(mac: &str, ssid: Option<&str>, signal: i32, band: Band, location: Option<(f64, f64)>) -> AccessPointSummary {
        AccessPointSummary {
            mac: mac.to_string(),
            ssid: ssid.map(str::to_string),
            device_type: Some("Wi-Fi AP".to_string()),
            best_signal: signal,
            band,
            location: location.map(|(lat, lon)| GeoPoint { lat, lon }),
            observation_count: 1,
            first_seen: 0,
            last_seen: 0,
        }
    }

    fn options() -> MapOptions {
        MapOptions {
            show_heatmap: true,
            min_signal: -100,
        }
    }

    #[test]
    fn test_signal_weight() {
        assert_eq!(signal_weight(-100, -100), 0.0);
        assert_eq!(signal_weight(0, -100), 1.0);
        assert_eq!(signal_weight(-50, -100), 0.5);
        assert_eq!(signal_weight(-120, -100), 0.0);
        assert_eq!(signal_weight(-30, -60), 0.5);
        assert_eq!(signal_weight(-30, 0), 1.0);
    }

    #[test]
    fn test_signal_weight_extreme_floor() {
        assert_eq!(signal_weight(5, i32::MIN), 1.0);
        assert_eq!(signal_weight(i32::MIN, i32::MIN), 0.0);
        let w = signal_weight(-50, i32::MIN);
        assert!(w > 0.99 && w < 1.0);
    }

    #[test]
    fn test_no_mapped_summaries() {
        let summaries = vec![summary("AA:BB:CC:DD:EE:FF", None, -50, Band::Five, None)];
        assert!(MapDocument::from_summaries(&summaries, &options()).is_none());
        assert!(MapDocument::from_summaries(&Vec::<AccessPointSummary>::new(), &options()).is_none());
    }

    #[test]
    fn test_layers_and_center() {
        let summaries = vec![
            summary("00:00:00:00:00:01", Some("A"), -50, Band::Five, Some((10.0, 20.0))),
            summary("00:00:00:00:00:02", Some("B"), -75, Band::TwoPointFour, Some((20.0, 40.0))),
            summary("00:00:00:00:00:03", None, -60, Band::Five, None),
        ];
        let doc = MapDocument::from_summaries(&summaries, &options()).unwrap();

        assert_eq!(doc.markers.len(), 2);
        assert_eq!(doc.center, GeoPoint { lat: 15.0, lon: 30.0 });
        assert_eq!(doc.zoom, DEFAULT_ZOOM);
        assert_eq!(doc.heat_layers.len(), 2);
        assert_eq!(doc.heat_layers[0].band, Band::TwoPointFour);
        assert_eq!(doc.heat_layers[0].name, "Heatmap 2.4 GHz (1 pts)");
        assert_eq!(doc.heat_layers[1].points, vec![HeatPoint(10.0, 20.0, 0.5)]);
        assert_eq!(doc.tile_layers.len(), 3);
    }

    #[test]
    fn test_heatmap_disabled() {
        let summaries = vec![summary("00:00:00:00:00:01", Some("A"), -50, Band::Five, Some((10.0, 20.0)))];
        let opts = MapOptions {
            show_heatmap: false,
            min_signal: -100,
        };
        let doc = MapDocument::from_summaries(&summaries, &opts).unwrap();
        assert!(doc.heat_layers.is_empty());
        assert_eq!(doc.markers.len(), 1);
    }

    #[test]
    fn test_popup_is_escaped() {
        let s = summary("00:00:00:00:00:01", Some("<script>x</script>"), -50, Band::Five, Some((1.0, 1.0)));
        let popup = popup_html(&s);
        assert!(!popup.contains("<script>"));
        assert!(popup.contains("&lt;script&gt;"));

        let hidden = summary("00:00:00:00:00:01", None, -50, Band::Five, Some((1.0, 1.0)));
        assert!(popup_html(&hidden).contains("Hidden"));
    }

    #[test]
    fn test_popup_seen_window() {
        let mut s = summary("00:00:00:00:00:01", Some("A"), -50, Band::Five, Some((1.0, 1.0)));
        s.observation_count = 3;
        s.first_seen = 1_700_000_000;
        s.last_seen = 1_700_000_090;
        let popup = popup_html(&s);
        assert!(popup.contains("<b>Seen:</b> 3 times"));
        assert!(popup.contains("<b>First seen:</b> 2023-11-14 22:13:20 UTC"));
        assert!(popup.contains("<b>Last seen:</b> 2023-11-14 22:14:50 UTC"));
    }

    #[test]
    fn test_render_leaflet_document() {
        let summaries = vec![summary("AA:BB:CC:DD:EE:FF", Some("Cafe</script>"), -55, Band::Five, Some((47.6, -122.3)))];
        let doc = MapDocument::from_summaries(&summaries, &options()).unwrap();
        let html = LeafletRenderer::new().unwrap().render(&doc).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("L.heatLayer"));
        assert!(html.contains("markerClusterGroup"));
        assert!(html.contains("L.control.layers"));
        assert!(html.contains("WiFi Signal Heatmap"));
        assert!(html.contains("Heatmap 5 GHz (1 pts)"));
        assert!(html.contains("AA:BB:CC:DD:EE:FF"));
        // three library tags plus the inline script; the SSID must not add one
        assert_eq!(html.matches("</script>").count(), 4);
    }
}
