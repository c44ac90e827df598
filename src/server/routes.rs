use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::AppConfig;
use crate::data::record::UnknownMetric;
use crate::data::views::{MapView, MetricTable};
use crate::data::Dataset;
use crate::server::api;
use crate::server::static_files;

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    UnknownMetric(#[from] UnknownMetric),
    #[error("Route not found")]
    NotFound,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownMetric(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        };
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the full application: JSON API under `/api`, the bundled console at
/// `/` (or a built frontend from `static_dir`), CORS and request tracing.
pub fn build_router(dataset: Arc<Dataset>, config: &AppConfig) -> Router {
    let state = AppState { dataset };

    // Unmatched /api paths stay JSON 404s even when a frontend owns the fallback.
    let mut app = Router::new()
        .route("/api/health", get(health))
        .route("/api/regions", get(regions))
        .route("/api/regions/:region/series", get(region_series))
        .route("/api/summary", get(summary))
        .route("/api/series", get(series))
        .route("/api/map", get(map))
        .route("/api/table/:metric", get(table))
        .route("/api/*rest", any(not_found));
    if config.headless {
        app = app.fallback(not_found);
    } else if let Some(frontend) = static_files::frontend_service(&config.static_dir) {
        app = app.fallback_service(frontend);
    } else {
        app = app.route("/", get(index)).fallback(not_found);
    }

    let app = app.with_state(state).layer(TraceLayer::new_for_http());
    if config.cors {
        debug!("CORS enabled for all origins");
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn health() -> Json<api::HealthResponse> {
    Json(api::health_payload())
}

async fn regions(State(state): State<AppState>) -> Json<api::RegionsResponse> {
    Json(api::regions_payload(&state.dataset))
}

async fn summary(State(state): State<AppState>) -> Json<api::SummaryResponse> {
    Json(api::summary_payload(&state.dataset))
}

async fn series(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<api::SeriesResponse> {
    let params = api::parse_series_params(&pairs);
    Json(api::series_payload(&state.dataset, &params))
}

async fn region_series(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<api::RegionSeriesResponse> {
    let params = api::parse_series_params(&pairs);
    Json(api::region_series_payload(&state.dataset, &region, &params))
}

async fn map(
    State(state): State<AppState>,
    Query(params): Query<api::MapParams>,
) -> Result<Json<MapView>, ApiError> {
    Ok(Json(api::map_payload(&state.dataset, &params)?))
}

async fn table(
    State(state): State<AppState>,
    Path(metric): Path<String>,
) -> Result<Json<MetricTable>, ApiError> {
    Ok(Json(api::table_payload(&state.dataset, &metric)?))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>COVID-19 Data Explorer</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 1000px; margin: 24px auto; padding: 0 12px; }
    h1 { margin-bottom: 8px; }
    .card { border: 1px solid #ddd; border-radius: 8px; padding: 14px; margin: 14px 0; }
    .totals span { display: inline-block; margin-right: 18px; font-weight: 600; }
    .deaths { color: #c0392b; } .active { color: #b7950b; } .recovered { color: #1e8449; } .confirmed { color: #2471a3; }
    label { display: block; margin: 8px 0 4px; font-weight: 600; }
    select, input { padding: 6px; }
    table { border-collapse: collapse; font-size: 0.85rem; }
    td, th { border: 1px solid #eee; padding: 2px 6px; text-align: right; }
    td:first-child, th:first-child { text-align: left; }
    .scroll { overflow: auto; max-height: 360px; }
    .note { color: #666; font-size: 0.85rem; }
  </style>
</head>
<body>
  <h1>COVID-19 Data Explorer</h1>
  <p>Spread of COVID-19 from the Johns Hopkins University CSSE time series.</p>

  <div class="card totals" id="totals">Loading totals…</div>

  <div class="card">
    <label for="view">Choose View</label>
    <select id="view">
      <option value="region">Data Visualization</option>
      <option value="raw">Raw Data</option>
      <option value="map">World Map</option>
    </select>
  </div>

  <div class="card" id="region-view">
    <label for="region">Select Region</label>
    <select id="region"></select>
    <label>Date range</label>
    <input id="start" type="date" /> – <input id="end" type="date" />
    <svg id="chart" width="960" height="300"></svg>
    <p class="note">Stacked bars: <span class="recovered">recovered</span>, <span class="active">active</span>, <span class="deaths">deaths</span>.</p>
  </div>

  <div class="card" id="raw-view" hidden>
    <label for="metric">Metric</label>
    <select id="metric">
      <option value="confirmed">Confirmed Cases</option>
      <option value="deaths">COVID-19 Related Deaths</option>
      <option value="recovered">Recovered</option>
    </select>
    <div class="scroll"><table id="raw-table"></table></div>
  </div>

  <div class="card" id="map-view" hidden>
    <label for="map-metric">Select Data Source</label>
    <select id="map-metric">
      <option value="confirmed">Confirmed Cases</option>
      <option value="deaths">COVID-19 Related Deaths</option>
      <option value="recovered">Recovered</option>
    </select>
    <label for="day">Day</label>
    <input id="day" type="range" min="0" value="0" style="width:100%" />
    <p id="map-date" class="note"></p>
    <svg id="map" width="960" height="480" style="background:#1b2631"></svg>
  </div>

  <script>
    const $ = (id) => document.getElementById(id);
    const fmt = (n) => n == null ? '–' : n.toLocaleString('en-US');
    const getJson = (path) => fetch(path).then((r) => r.json());
    const NS = 'http://www.w3.org/2000/svg';

    function svgEl(tag, attrs) {
      const el = document.createElementNS(NS, tag);
      for (const [k, v] of Object.entries(attrs)) el.setAttribute(k, v);
      return el;
    }

    async function loadTotals() {
      const s = await getJson('/api/summary');
      $('totals').innerHTML =
        '<div class="note">Last updated: ' + s.last_updated + '</div>' +
        '<span class="deaths">Deaths: ' + fmt(s.deaths) + '</span>' +
        '<span class="active">Active: ' + fmt(s.active) + '</span>' +
        '<span class="recovered">Recovered: ' + fmt(s.recovered) + '</span>' +
        '<span class="confirmed">Confirmed: ' + fmt(s.confirmed) + '</span>';
    }

    async function loadRegions() {
      const info = await getJson('/api/regions');
      const select = $('region');
      for (const name of info.regions) {
        const opt = document.createElement('option');
        opt.value = name; opt.textContent = name;
        if (name === info.default_region) opt.selected = true;
        select.appendChild(opt);
      }
      $('start').value = info.first_date; $('end').value = info.last_date;
      $('day').max = info.days - 1; $('day').value = info.days - 1;
      drawRegion();
    }

    async function drawRegion() {
      const region = encodeURIComponent($('region').value);
      const q = '?start=' + $('start').value + '&end=' + $('end').value;
      const data = await getJson('/api/regions/' + region + '/series' + q);
      const chart = $('chart');
      chart.innerHTML = '';
      const pts = data.points;
      if (!pts.length) return;
      const max = Math.max(...pts.map((p) => p.confirmed)) || 1;
      const w = 960 / pts.length, h = 280;
      pts.forEach((p, i) => {
        const deaths = p.deaths || 0, recovered = p.recovered || 0;
        const active = Math.max(p.confirmed_active ?? p.confirmed, 0);
        let y = h;
        for (const [value, color] of [[deaths, '#c0392b'], [active, '#f1c40f'], [recovered, '#229954']]) {
          const bh = value / max * h;
          y -= bh;
          chart.appendChild(svgEl('rect', { x: i * w, y: y, width: Math.max(w - 1, 1), height: bh, fill: color }));
        }
      });
    }

    async function drawRaw() {
      const t = await getJson('/api/table/' + $('metric').value);
      const head = '<tr><th>Region</th>' + t.dates.map((d) => '<th>' + d + '</th>').join('') + '</tr>';
      const rows = t.rows.map((r) => '<tr><td>' + r.region + '</td>' + r.values.map((v) => '<td>' + fmt(v) + '</td>').join('') + '</tr>');
      $('raw-table').innerHTML = head + rows.join('');
    }

    async function drawMap() {
      const m = await getJson('/api/map?metric=' + $('map-metric').value + '&day=' + $('day').value);
      $('map-date').textContent = 'Data displayed for ' + m.date;
      const map = $('map');
      map.innerHTML = '';
      const max = Math.max(...m.points.map((p) => p.value), 1);
      for (const p of m.points) {
        const x = (p.long + 180) / 360 * 960, y = (90 - p.lat) / 180 * 480;
        const c = svgEl('circle', { cx: x, cy: y, r: 2 + 18 * Math.sqrt(p.value / max), fill: 'rgba(231,76,60,0.5)' });
        const title = svgEl('title', {});
        title.textContent = (p.province ? p.province + ', ' : '') + p.region + ': ' + p.value_string;
        c.appendChild(title);
        map.appendChild(c);
      }
    }

    function switchView() {
      const v = $('view').value;
      $('region-view').hidden = v !== 'region';
      $('raw-view').hidden = v !== 'raw';
      $('map-view').hidden = v !== 'map';
      if (v === 'raw') drawRaw();
      if (v === 'map') drawMap();
    }

    $('view').addEventListener('change', switchView);
    for (const id of ['region', 'start', 'end']) $(id).addEventListener('change', drawRegion);
    $('metric').addEventListener('change', drawRaw);
    $('map-metric').addEventListener('change', drawMap);
    $('day').addEventListener('input', drawMap);
    loadTotals();
    loadRegions();
  </script>
</body>
</html>
"#;
