//! In-process mock of the Alissa Interpret public API
//!
//! Serves the token, listing, detail and export endpoints from fixture data
//! and records every request so tests can assert on network activity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alissa_common::config::ConnectionConfig;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

pub const USERNAME: &str = "reviewer";
pub const PASSWORD: &str = "secret";

type Reply = Result<Json<Value>, (StatusCode, String)>;

/// One recorded export-creation request
#[derive(Debug, Clone)]
pub struct ExportRequestLog {
    pub kind: String,
    pub analysis_id: u64,
    pub variant: String,
    pub body: Value,
}

/// Fixture data and request log
#[derive(Debug, Default)]
pub struct MockState {
    pub analyses: Vec<Value>,
    /// Analysis detail by id
    pub details: HashMap<u64, Value>,
    /// Export payload by (analysis id, variant path segment)
    pub payloads: HashMap<(u64, String), Vec<Value>>,
    /// Not-ready replies served before each export becomes ready
    pub not_ready_replies: u32,
    /// Status served for every export fetch instead of the payload
    pub fetch_status: Option<u16>,

    pub requests: u32,
    pub token_requests: u32,
    pub detail_requests: Vec<(String, u64)>,
    pub export_requests: Vec<ExportRequestLog>,
    pub export_fetches: u32,
    pub last_listing_query: HashMap<String, String>,
    pub uploads: Vec<(String, String, usize)>,

    next_export: u64,
    pending: HashMap<String, (u64, String, u32)>,
}

impl MockState {
    pub fn with_analysis(mut self, summary: Value, detail: Value) -> Self {
        let id = summary["id"].as_u64().expect("fixture analysis needs an id");
        self.analyses.push(summary);
        self.details.insert(id, detail);
        self
    }

    pub fn with_payload(mut self, analysis_id: u64, variant: &str, records: Vec<Value>) -> Self {
        self.payloads.insert((analysis_id, variant.to_string()), records);
        self
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Running mock server
pub struct MockAlissa {
    pub base_uri: String,
    state: Shared,
}

impl MockAlissa {
    pub async fn start(state: MockState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });

        Self {
            base_uri: format!("http://{}", addr),
            state,
        }
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            base_uri: self.base_uri.clone(),
            client_id: "client".to_string(),
            client_secret: "client-secret".to_string(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/oauth/token", post(token))
        .route("/interpret/api/2/analyses", get(list_analyses))
        .route("/interpret/api/2/patients", get(list_patients))
        .route("/interpret/api/2/data_files", get(list_data_files).post(upload_data_file))
        .route("/interpret/api/2/patient_analyses/:id", get(patient_detail))
        .route("/interpret/api/2/inheritance_analyses/:id", get(inheritance_detail))
        .route(
            "/interpret/api/2/patient_analyses/:id/:variant/exports",
            post(create_patient_export),
        )
        .route(
            "/interpret/api/2/inheritance_analyses/:id/:variant/exports",
            post(create_inheritance_export),
        )
        .route(
            "/interpret/api/2/patient_analyses/:id/:variant/exports/:export_id",
            get(fetch_export),
        )
        .route(
            "/interpret/api/2/inheritance_analyses/:id/:variant/exports/:export_id",
            get(fetch_export),
        )
        .with_state(state)
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().expect("mock state lock")
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Reply {
    let mut s = lock(&state);
    s.requests += 1;
    s.token_requests += 1;

    let valid = form.get("grant_type").map(String::as_str) == Some("password")
        && form.get("username").map(String::as_str) == Some(USERNAME)
        && form.get("password").map(String::as_str) == Some(PASSWORD);

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "invalid_grant".to_string()));
    }

    Ok(Json(json!({
        "access_token": "test-token",
        "token_type": "bearer",
        "expires_in": 3600
    })))
}

async fn list_analyses(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let mut s = lock(&state);
    s.requests += 1;
    s.last_listing_query = query;
    Ok(Json(Value::Array(s.analyses.clone())))
}

async fn list_patients(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let mut s = lock(&state);
    s.requests += 1;
    s.last_listing_query = query.clone();
    Ok(Json(json!([{
        "id": 9,
        "accessionNumber": "P9",
        "familyIdentifier": query.get("familyIdentifier"),
    }])))
}

async fn list_data_files(State(state): State<Shared>) -> Reply {
    let mut s = lock(&state);
    s.requests += 1;
    Ok(Json(json!([{"id": 77, "name": "sample.vcf", "type": "VCF_FILE"}])))
}

async fn upload_data_file(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Reply {
    let mut uploaded = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            uploaded = Some((name, bytes.len()));
        }
    }

    let (name, size) = uploaded.ok_or((StatusCode::BAD_REQUEST, "missing file".to_string()))?;
    let file_type = query.get("type").cloned().unwrap_or_default();

    let mut s = lock(&state);
    s.requests += 1;
    s.uploads.push((name.clone(), file_type.clone(), size));

    Ok(Json(json!({"id": 78, "name": name, "type": file_type})))
}

fn detail(state: &Shared, kind: &str, id: u64) -> Reply {
    let mut s = lock(state);
    s.requests += 1;
    s.detail_requests.push((kind.to_string(), id));
    s.details
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("analysis {} not found", id)))
}

async fn patient_detail(State(state): State<Shared>, Path(id): Path<u64>) -> Reply {
    detail(&state, "patient_analyses", id)
}

async fn inheritance_detail(State(state): State<Shared>, Path(id): Path<u64>) -> Reply {
    detail(&state, "inheritance_analyses", id)
}

fn create_export(state: &Shared, kind: &str, id: u64, variant: String, body: Value) -> Reply {
    let mut s = lock(state);
    s.requests += 1;
    s.next_export += 1;

    let export_id = format!("exp-{}", s.next_export);
    let not_ready = s.not_ready_replies;
    s.pending
        .insert(export_id.clone(), (id, variant.clone(), not_ready));
    s.export_requests.push(ExportRequestLog {
        kind: kind.to_string(),
        analysis_id: id,
        variant,
        body,
    });

    Ok(Json(json!({ "exportId": export_id })))
}

async fn create_patient_export(
    State(state): State<Shared>,
    Path((id, variant)): Path<(u64, String)>,
    Json(body): Json<Value>,
) -> Reply {
    create_export(&state, "patient_analyses", id, variant, body)
}

async fn create_inheritance_export(
    State(state): State<Shared>,
    Path((id, variant)): Path<(u64, String)>,
    Json(body): Json<Value>,
) -> Reply {
    create_export(&state, "inheritance_analyses", id, variant, body)
}

async fn fetch_export(
    State(state): State<Shared>,
    Path((id, variant, export_id)): Path<(u64, String, String)>,
) -> Reply {
    let mut s = lock(&state);
    s.requests += 1;
    s.export_fetches += 1;

    if let Some(status) = s.fetch_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((status, "forced failure".to_string()));
    }

    let remaining = match s.pending.get_mut(&export_id) {
        Some((pending_id, pending_variant, remaining))
            if *pending_id == id && *pending_variant == variant =>
        {
            remaining
        }
        _ => return Err((StatusCode::NOT_FOUND, format!("unknown export {}", export_id))),
    };

    if *remaining > 0 {
        *remaining -= 1;
        return Err((StatusCode::NOT_FOUND, "export not ready".to_string()));
    }

    let records = s.payloads.get(&(id, variant)).cloned().unwrap_or_default();
    Ok(Json(Value::Array(records)))
}

/// Listing entry with sensible defaults
pub fn analysis_summary(id: u64, reference: &str, analysis_type: &str, tree: Option<&str>) -> Value {
    json!({
        "id": id,
        "reference": reference,
        "analysisType": analysis_type,
        "analysisPipelineName": "exome v2",
        "targetPanelNames": ["Cardio", "Epilepsy"],
        "classificationTreeName": tree,
        "createdOn": "2021-03-04T10:11:12.000+0000",
        "lastUpdatedOn": "2021-03-05T08:00:00.000+0000",
        "status": "IN_PROGRESS"
    })
}

/// Analysis detail with one lab result per (molecular, cnv) pair
pub fn analysis_detail(counts: &[(u64, u64)]) -> Value {
    let lab_results: Vec<Value> = counts
        .iter()
        .map(|(molecular, cnv)| {
            json!({
                "analysisVariantCount": {
                    "molecularVariantCount": molecular,
                    "copyNumberVariationCount": cnv
                }
            })
        })
        .collect();
    json!({ "labResults": lab_results })
}

/// Exported variant carrying the given label string
pub fn variant(labels: &str) -> Value {
    json!({
        "chromosome": "1",
        "classificationTreeLabelsScore": { "labels": labels }
    })
}
