#![cfg(feature = "web")]
#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::auth;
use crate::chart::{self, ChartConfig, ChartKind, RenderOptions};
use crate::dataset::{Dataset, SAMPLE_ROWS};
use crate::downloader;
use crate::loader;
use crate::registry::DataRegistry;
use crate::store::{self, DatasetStore};

// Uploads above this size are rejected with a message.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    registry: Mutex<DataRegistry>,
}

#[derive(Serialize)]
struct ApiMessage {
    status: String,
    message: Option<String>,
}

impl ApiMessage {
    fn ok() -> Self {
        ApiMessage {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ApiMessage {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiMessage::error(message))).into_response()
}

#[derive(Deserialize)]
struct ChartRequest {
    dataset_id: Option<String>,
    kind: String,
    category: String,
    value: String,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: String,
}

pub async fn run(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    auth::init_database()?;

    let store = DatasetStore::open("database")?;
    let registry = DataRegistry::open(store)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    log::info!("loaded {} datasets from the store", registry.datasets().len());

    let app_state = Arc::new(AppState {
        registry: Mutex::new(registry),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/upload", post(upload_dataset))
        .route("/api/datasets", get(list_datasets))
        .route("/api/datasets/:id", get(get_dataset))
        .route("/api/datasets/:id/select", post(select_dataset))
        .route("/api/datasets/:id/remove", post(remove_dataset))
        .route("/api/datasets/:id/export", get(export_dataset))
        .route("/api/datasets/:id/archive", get(archive_dataset))
        .route("/api/import", post(import_dataset))
        .route("/api/current", get(current_dataset))
        .route("/api/stats", get(dashboard_stats))
        .route("/api/chart", post(render_chart))
        .route("/api/signup", post(auth::handle_signup))
        .route("/api/login", post(auth::handle_login))
        .route("/api/logout", post(auth::handle_logout))
        .route("/api/me", get(auth::handle_me))
        .nest_service("/charts", ServeDir::new("chart_output"))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    log::info!("listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let mut file_bytes: Vec<u8> = Vec::new();
    let mut filename = String::new();
    let mut dataset_name = String::new();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                file_bytes = field.bytes().await.unwrap_or_default().to_vec();
            }
            "name" => {
                dataset_name = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    if file_bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file data received");
    }
    if !loader::is_supported(&filename) {
        return error_response(StatusCode::BAD_REQUEST, loader::UNSUPPORTED_MESSAGE);
    }
    if file_bytes.len() > MAX_UPLOAD_BYTES {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "File is too large. The limit is 10 MB.");
    }

    // Parse from a temporary file carrying the original extension, so the
    // loader can dispatch on it.
    let extension = filename.rsplit('.').next().unwrap_or("csv").to_lowercase();
    let table = {
        let mut temp = match tempfile::Builder::new()
            .suffix(&format!(".{}", extension))
            .tempfile()
        {
            Ok(temp) => temp,
            Err(e) => {
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        };
        if let Err(e) = temp.write_all(&file_bytes) {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
        match loader::load_table(temp.path()) {
            Ok(table) => table,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    };

    let name = if dataset_name.trim().is_empty() {
        loader::default_name(&filename)
    } else {
        dataset_name.trim().to_string()
    };
    let created_by = auth::session_username(&jar).unwrap_or_else(|| "unknown".to_string());

    let dataset = Dataset::new(&name, table.columns, table.rows, &created_by);
    let preview = dataset.preview(SAMPLE_ROWS).to_vec();
    log::info!(
        "parsed upload {:?} into dataset {:?} ({} rows)",
        filename,
        dataset.name,
        dataset.row_count()
    );

    let mut registry = state.registry.lock().unwrap();
    match registry.add_dataset(dataset) {
        Ok(summary) => Json(serde_json::json!({
            "status": "ok",
            "dataset": summary,
            "preview": preview,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn list_datasets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.lock().unwrap();
    Json(serde_json::json!({
        "status": "ok",
        "datasets": registry.summaries(),
    }))
}

async fn get_dataset(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = state.registry.lock().unwrap();

    match registry.get(&id) {
        Some(dataset) => Json(serde_json::json!({
            "status": "ok",
            "dataset": crate::registry::DatasetSummary::of(dataset),
            "numeric_columns": dataset.numeric_columns(),
            "preview": dataset.preview(SAMPLE_ROWS),
            "chart_defaults": ChartConfig::defaults_for(dataset),
        }))
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Dataset not found"),
    }
}

async fn select_dataset(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mut registry = state.registry.lock().unwrap();

    match registry.set_current(&id) {
        Ok(()) => Json(ApiMessage::ok()).into_response(),
        Err(message) => error_response(StatusCode::NOT_FOUND, message),
    }
}

async fn remove_dataset(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mut registry = state.registry.lock().unwrap();

    match registry.remove_dataset(&id) {
        Ok(true) => Json(ApiMessage::ok()).into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Dataset not found"),
        Err(message) => error_response(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

async fn current_dataset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.lock().unwrap();
    let dataset = registry
        .current_dataset()
        .map(crate::registry::DatasetSummary::of);

    // An empty collection degrades to a null dataset, not an error.
    Json(serde_json::json!({
        "status": "ok",
        "dataset": dataset,
        "selected": registry.selected_id(),
    }))
}

async fn dashboard_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.lock().unwrap();
    Json(registry.dashboard())
}

async fn render_chart(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChartRequest>,
) -> Response {
    let kind = match ChartKind::parse(&request.kind) {
        Some(kind) => kind,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Unknown chart kind: {}", request.kind),
            );
        }
    };

    // Clone the dataset out so rendering happens outside the lock.
    let dataset = {
        let registry = state.registry.lock().unwrap();
        let found = match &request.dataset_id {
            Some(id) => registry.get(id),
            None => registry.current_dataset(),
        };
        match found {
            Some(dataset) => dataset.clone(),
            None => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    "No datasets available. Upload a dataset to create visualizations.",
                );
            }
        }
    };

    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| chart::DEFAULT_TITLE.to_string());
    let config = ChartConfig::new(kind, &request.category, &request.value, &title);

    let mut options = RenderOptions::default();
    if let Some(width) = request.width {
        options.width = width;
    }
    if let Some(height) = request.height {
        options.height = height;
    }

    match chart::render_chart(&dataset, &config, options) {
        Ok(png_data) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .header(
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    downloader::chart_filename(&config.title)
                ),
            )
            .body(axum::body::Body::from(Bytes::from(png_data)))
            .unwrap(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn export_dataset(
    Path(id): Path<String>,
    Query(params): Query<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let dataset = {
        let registry = state.registry.lock().unwrap();
        match registry.get(&id) {
            Some(dataset) => dataset.clone(),
            None => return error_response(StatusCode::NOT_FOUND, "Dataset not found"),
        }
    };

    match params.format.to_lowercase().as_str() {
        "csv" => match downloader::to_csv(&dataset) {
            Ok(csv) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/csv")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.csv\"", dataset.name),
                )
                .body(axum::body::Body::from(csv))
                .unwrap(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        "xlsx" => match downloader::to_xlsx(&dataset) {
            Ok(bytes) => Response::builder()
                .status(StatusCode::OK)
                .header(
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                )
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.xlsx\"", dataset.name),
                )
                .body(axum::body::Body::from(Bytes::from(bytes)))
                .unwrap(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        other => error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported export format: {}", other),
        ),
    }
}

async fn archive_dataset(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let dataset = {
        let registry = state.registry.lock().unwrap();
        match registry.get(&id) {
            Some(dataset) => dataset.clone(),
            None => return error_response(StatusCode::NOT_FOUND, "Dataset not found"),
        }
    };

    match store::archive_dataset(&dataset) {
        Ok(buffer) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/gzip")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.json.gz\"", dataset.name),
            )
            .body(axum::body::Body::from(Bytes::from(buffer)))
            .unwrap(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn import_dataset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name().unwrap_or("unknown") == "archive" {
            file_data = field.bytes().await.unwrap_or_default().to_vec();
        }
    }

    if file_data.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file data received");
    }

    match store::unarchive_dataset(&file_data) {
        Ok(dataset) => {
            let mut registry = state.registry.lock().unwrap();
            match registry.add_dataset(dataset) {
                Ok(summary) => Json(serde_json::json!({
                    "status": "ok",
                    "dataset": summary,
                }))
                .into_response(),
                Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
            }
        }
        Err(e) => error_response(
            StatusCode::BAD_REQUEST,
            format!("Failed to import dataset: {}", e),
        ),
    }
}
