//! Alissa Interpret public API client
//!
//! Authenticates with the OAuth2 password grant and exposes the endpoints
//! used by the review tooling, including variant export creation/retrieval.

use alissa_common::config::ConnectionConfig;
use alissa_common::params::QueryParams;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ReviewError, ReviewResult};
use crate::models::{
    AnalysisDetail, AnalysisKind, AnalysisSummary, ExportHandle, ExportRequest, VariantKind,
    VariantRecord,
};

const API_PATH: &str = "interpret/api/2";
const TOKEN_PATH: &str = "auth/oauth/token";
const USER_AGENT: &str = concat!("alissa-review/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// File type that selects Alissa's default VCF parser
pub const VCF_FILE_TYPE: &str = "VCF_FILE";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Filter for the `analyses` listing
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    pub status: Option<String>,
    /// Lower bound, e.g. `2021-01-01T00:00:00.000+0000`
    pub created_after: Option<String>,
    pub reference: Option<String>,
    pub analysis_type: Option<String>,
}

impl AnalysisFilter {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("status", self.status.as_deref())
            .push("created_after", self.created_after.as_deref())
            .push("reference", self.reference.as_deref())
            .push("analysis_type", self.analysis_type.as_deref())
    }
}

/// Filter for the `patients` listing
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub accession_number: Option<String>,
    pub family_identifier: Option<String>,
    pub gender: Option<String>,
}

impl PatientFilter {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("accession_number", self.accession_number.as_deref())
            .push("family_identifier", self.family_identifier.as_deref())
            .push("gender", self.gender.as_deref())
    }
}

/// Filter for the `data_files` listing
#[derive(Debug, Clone, Default)]
pub struct DataFileFilter {
    pub name: Option<String>,
    pub created_after: Option<String>,
    pub last_updated_by: Option<String>,
}

impl DataFileFilter {
    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .push("name", self.name.as_deref())
            .push("created_after", self.created_after.as_deref())
            .push("last_updated_by", self.last_updated_by.as_deref())
    }
}

/// Authenticated connection to one Alissa server
///
/// Created with [`AlissaClient::connect`]; [`AlissaClient::close`] ends the
/// session.
pub struct AlissaClient {
    http_client: reqwest::Client,
    base_uri: String,
    access_token: String,
}

impl AlissaClient {
    /// Fetch an access token and open a session
    pub async fn connect(config: &ConnectionConfig) -> ReviewResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        let token_url = format!("{}/{}", config.base_uri, TOKEN_PATH);
        tracing::debug!(url = %token_url, username = %config.username, "Requesting access token");

        let response = http_client
            .post(&token_url)
            .form(&[
                ("grant_type", "password"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Auth(format!("token request returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await.map_err(|e| ReviewError::Parse {
            endpoint: TOKEN_PATH.to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(
            base_uri = %config.base_uri,
            expires_in = ?token.expires_in,
            "Connected to Alissa Interpret"
        );

        Ok(Self {
            http_client,
            base_uri: config.base_uri.clone(),
            access_token: token.access_token,
        })
    }

    /// End the session
    pub fn close(self) {
        tracing::debug!(base_uri = %self.base_uri, "Closing Alissa session");
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_uri, API_PATH, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> ReviewResult<T> {
        let url = self.api_url(endpoint);
        tracing::debug!(url = %url, params = ?params.as_pairs(), "GET");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(params.as_pairs())
            .send()
            .await
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        decode(endpoint, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ReviewResult<T> {
        let url = self.api_url(endpoint);
        tracing::debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        decode(endpoint, response).await
    }

    /// List analyses matching the filter
    pub async fn get_analyses(&self, filter: &AnalysisFilter) -> ReviewResult<Vec<AnalysisSummary>> {
        self.get_json("analyses", &filter.to_params()).await
    }

    pub async fn get_analysis(&self, id: u64) -> ReviewResult<AnalysisSummary> {
        self.get_json(&format!("analyses/{}", id), &QueryParams::new())
            .await
    }

    /// Patient or inheritance analysis detail, including lab results
    pub async fn get_analysis_detail(
        &self,
        kind: AnalysisKind,
        id: u64,
    ) -> ReviewResult<AnalysisDetail> {
        self.get_json(&format!("{}/{}", kind.path_segment(), id), &QueryParams::new())
            .await
    }

    pub async fn get_patients(&self, filter: &PatientFilter) -> ReviewResult<Vec<serde_json::Value>> {
        self.get_json("patients", &filter.to_params()).await
    }

    pub async fn get_analyses_of_patient(
        &self,
        patient_id: u64,
    ) -> ReviewResult<Vec<AnalysisSummary>> {
        self.get_json(&format!("patients/{}/analyses", patient_id), &QueryParams::new())
            .await
    }

    pub async fn get_data_files(
        &self,
        filter: &DataFileFilter,
    ) -> ReviewResult<Vec<serde_json::Value>> {
        self.get_json("data_files", &filter.to_params()).await
    }

    pub async fn get_data_file(&self, id: u64) -> ReviewResult<serde_json::Value> {
        self.get_json(&format!("data_files/{}", id), &QueryParams::new())
            .await
    }

    /// Upload a data file; `file_type` selects the server-side parser
    pub async fn post_data_file(
        &self,
        path: &Path,
        file_type: &str,
    ) -> ReviewResult<serde_json::Value> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone()),
        );

        let endpoint = "data_files";
        let url = self.api_url(endpoint);
        tracing::info!(file = %file_name, file_type = %file_type, "Uploading data file");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("type", file_type)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        decode(endpoint, response).await
    }

    /// Request an export of every variant of one kind
    pub async fn create_variant_export(
        &self,
        kind: AnalysisKind,
        analysis_id: u64,
        variant_kind: VariantKind,
    ) -> ReviewResult<ExportHandle> {
        self.post_json(
            &export_endpoint(kind, analysis_id, variant_kind),
            &ExportRequest::all_variants(),
        )
        .await
    }

    /// Fetch a previously requested export
    ///
    /// Returns [`ReviewError::Http`] while the export is still being prepared.
    pub async fn get_variant_export(
        &self,
        kind: AnalysisKind,
        analysis_id: u64,
        variant_kind: VariantKind,
        export_id: &str,
    ) -> ReviewResult<Vec<VariantRecord>> {
        let endpoint = format!(
            "{}/{}",
            export_endpoint(kind, analysis_id, variant_kind),
            export_id
        );
        self.get_json(&endpoint, &QueryParams::new()).await
    }
}

/// `{kind}/{id}/{variants}/exports`
pub fn export_endpoint(kind: AnalysisKind, analysis_id: u64, variant_kind: VariantKind) -> String {
    format!(
        "{}/{}/{}/exports",
        kind.path_segment(),
        analysis_id,
        variant_kind.path_segment()
    )
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> ReviewResult<T> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ReviewError::Auth(format!("unauthorized on {}", endpoint)));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ReviewError::Http {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        });
    }

    response.json().await.map_err(|e| ReviewError::Parse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
