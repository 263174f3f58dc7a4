//! Alissa Interpret API payloads and analysis/variant kinds
//!
//! Only the fields this tool reads are modelled; unknown fields are ignored
//! by serde.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of analysis; selects the endpoint family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisKind {
    /// Single-sample analysis
    Patient,
    /// Family (trio) analysis
    Inheritance,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 2] = [AnalysisKind::Patient, AnalysisKind::Inheritance];

    /// Value used by the API's `analysisType` field and the store
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Patient => "PATIENT",
            AnalysisKind::Inheritance => "INHERITANCE",
        }
    }

    /// Endpoint family for analysis detail and exports
    pub fn path_segment(&self) -> &'static str {
        match self {
            AnalysisKind::Patient => "patient_analyses",
            AnalysisKind::Inheritance => "inheritance_analyses",
        }
    }

    /// Parse an `analysisType` value; other analysis types yield `None`
    pub fn from_api(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_api(s).ok_or_else(|| format!("unknown analysis type '{}'", s))
    }
}

/// Kind of variant list to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    MolecularVariant,
    CopyNumberVariation,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::MolecularVariant => "molecular_variant",
            VariantKind::CopyNumberVariation => "copy_number_variation",
        }
    }

    /// Collection segment below an analysis, e.g. `molecular_variants`
    pub fn path_segment(&self) -> &'static str {
        match self {
            VariantKind::MolecularVariant => "molecular_variants",
            VariantKind::CopyNumberVariation => "copy_number_variations",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis as returned by the `analyses` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: u64,
    pub reference: String,
    pub analysis_type: String,
    #[serde(default)]
    pub analysis_pipeline_name: Option<String>,
    #[serde(default)]
    pub target_panel_names: Vec<String>,
    #[serde(default)]
    pub classification_tree_name: Option<String>,
    pub created_on: String,
    pub last_updated_on: String,
}

impl AnalysisSummary {
    /// Supported analysis kind, `None` for any other `analysisType`
    pub fn kind(&self) -> Option<AnalysisKind> {
        AnalysisKind::from_api(&self.analysis_type)
    }

    pub fn has_classification_tree(&self) -> bool {
        self.classification_tree_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

/// Patient or inheritance analysis detail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetail {
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
}

/// Per-sample lab result of an analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default)]
    pub analysis_variant_count: Option<AnalysisVariantCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisVariantCount {
    #[serde(default)]
    pub molecular_variant_count: u64,
    #[serde(default)]
    pub copy_number_variation_count: u64,
}

/// Variant totals summed over all lab results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantTotals {
    pub molecular: u64,
    pub cnv: u64,
}

impl AnalysisDetail {
    pub fn variant_totals(&self) -> VariantTotals {
        self.lab_results
            .iter()
            .filter_map(|result| result.analysis_variant_count.as_ref())
            .fold(VariantTotals::default(), |totals, count| VariantTotals {
                molecular: totals.molecular + count.molecular_variant_count,
                cnv: totals.cnv + count.copy_number_variation_count,
            })
    }
}

/// Body of an export-creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub marked_for_review: bool,
    pub marked_include_in_report: bool,
}

impl ExportRequest {
    /// Export every variant, not only those already marked
    ///
    /// Labels are counted locally, so the unfiltered list is needed.
    pub fn all_variants() -> Self {
        Self {
            marked_for_review: false,
            marked_include_in_report: false,
        }
    }
}

/// Reply to an export-creation request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHandle {
    #[serde(deserialize_with = "string_or_number")]
    pub export_id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number export id, got {}",
            other
        ))),
    }
}

/// One exported variant; only the classification labels are read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    #[serde(default)]
    pub classification_tree_labels_score: Option<LabelsScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelsScore {
    /// Either one label string or a list of label strings
    #[serde(default)]
    pub labels: Option<serde_json::Value>,
}

impl VariantRecord {
    /// Record carrying a single label string
    pub fn with_labels(labels: &str) -> Self {
        Self {
            classification_tree_labels_score: Some(LabelsScore {
                labels: Some(serde_json::Value::String(labels.to_string())),
            }),
        }
    }

    /// All labels as one string; list entries are joined with `;`
    pub fn labels_text(&self) -> String {
        let labels = self
            .classification_tree_labels_score
            .as_ref()
            .and_then(|score| score.labels.as_ref());

        match labels {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            _ => String::new(),
        }
    }
}
