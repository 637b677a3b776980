use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Category, LaptopRow, ProgramReq};
use crate::results::ResultFilters;
use crate::software::{SoftwareFilter, UserMachine};
use crate::weights::CategoryWeights;
use crate::wizard::{Recommendation, WizardState};

/// Queries shorter than this never reach the database.
pub const MIN_SUGGEST_QUERY_CHARS: usize = 2;
pub const DEFAULT_SUGGEST_LIMIT: u32 = 10;
pub const DEFAULT_PROGRAM_SEARCH_LIMIT: u32 = 20;
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Component table a hardware suggestion is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HwKind {
    Cpu,
    Gpu,
    Ram,
}

impl HwKind {
    /// Name of the fuzzy suggestion procedure for this component type.
    pub fn suggest_function(self) -> &'static str {
        match self {
            Self::Cpu => "cpu_suggest",
            Self::Gpu => "gpu_suggest",
            Self::Ram => "ram_suggest",
        }
    }
}

impl fmt::Display for HwKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Ram => "ram",
        })
    }
}

impl FromStr for HwKind {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "ram" => Ok(Self::Ram),
            other => Err(format!("unknown hardware type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SuggestParams {
    /// One of "cpu", "gpu", "ram".
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Partial component name, at least two characters.
    #[serde(default)]
    pub q: Option<String>,
    /// Maximum number of suggestions (default: 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SuggestParams {
    /// The validated `(kind, query, limit)` triple, or `None` when the request
    /// should be answered with an empty list.
    pub fn validated(&self) -> Option<(HwKind, String, u32)> {
        let kind = self.kind.as_deref()?.parse::<HwKind>().ok()?;
        let q = self.q.clone().unwrap_or_default();
        if q.trim().chars().count() < MIN_SUGGEST_QUERY_CHARS {
            return None;
        }
        Some((kind, q, self.limit.unwrap_or(DEFAULT_SUGGEST_LIMIT)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestResponse {
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ProgramSearchParams {
    /// Part of a program or game name.
    #[serde(default)]
    pub q: Option<String>,
    /// Maximum number of matches (default: 20, max: 50).
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ProgramSearchParams {
    pub fn validated(&self) -> Option<(String, u32)> {
        let q = self.q.as_deref().unwrap_or("").trim().to_string();
        if q.chars().count() < MIN_SUGGEST_QUERY_CHARS {
            return None;
        }
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PROGRAM_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        Some((q, limit))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgramSearchResponse {
    pub programs: Vec<ProgramReq>,
}

/// Selection to rank laptops for. Weights are percentages; omitted weights
/// start from an equal split and everything is renormalised to 100.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RecommendRequest {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub weights: std::collections::HashMap<String, f64>,
    #[serde(default)]
    pub program_ids: Vec<i64>,
    #[serde(default)]
    pub filters: ResultFilters,
}

impl RecommendRequest {
    pub fn into_state(self) -> Result<WizardState, String> {
        if let Some(unknown) = self
            .categories
            .iter()
            .find(|c| !crate::model::is_known_category(c))
        {
            return Err(format!("unknown category: {unknown}"));
        }
        Ok(WizardState {
            categories: CategoryWeights::from_pairs(&self.categories, &self.weights),
            program_ids: self.program_ids,
            filters: self.filters,
            ..WizardState::default()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendResponse {
    /// Canonical query string for this selection, usable as a share link.
    pub share_query: String,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CompareParams {
    /// Comma separated laptop ids; only the first three numeric ids are used.
    #[serde(default)]
    pub ids: String,
}

impl CompareParams {
    pub fn parsed_ids(&self) -> Vec<i64> {
        self.ids
            .split(',')
            .filter_map(|x| x.trim().parse::<i64>().ok())
            .take(crate::wizard::MAX_COMPARE)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LaptopIdParams {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LaptopListResponse {
    pub laptops: Vec<LaptopRow>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SoftwareBrowseRequest {
    #[serde(default)]
    pub filter: SoftwareFilter,
    /// When given, each hit is annotated with a compatibility verdict.
    #[serde(default)]
    pub machine: Option<UserMachine>,
}

/// Hardware the user already owns, for the `programs_by_user_specs` procedure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserSpecs {
    #[serde(default)]
    pub ram_gb: Option<f64>,
    #[serde(default)]
    pub cpu_score: Option<f64>,
    #[serde(default)]
    pub gpu_score: Option<f64>,
}

impl UserSpecs {
    pub fn rpc_args(&self) -> serde_json::Value {
        serde_json::json!({
            "p_ram_gb": self.ram_gb,
            "p_cpu_score": self.cpu_score,
            "p_gpu_score": self.gpu_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_params_reject_bad_type_and_short_query() {
        let ok = SuggestParams {
            kind: Some("GPU".to_string()),
            q: Some("rtx".to_string()),
            limit: None,
        };
        let (kind, q, limit) = ok.validated().unwrap();
        assert_eq!(kind, HwKind::Gpu);
        assert_eq!(kind.suggest_function(), "gpu_suggest");
        assert_eq!(q, "rtx");
        assert_eq!(limit, 10);

        let short = SuggestParams {
            q: Some(" r ".to_string()),
            ..ok.clone()
        };
        assert!(short.validated().is_none());

        let bad_type = SuggestParams {
            kind: Some("ssd".to_string()),
            ..ok.clone()
        };
        assert!(bad_type.validated().is_none());
        assert!(SuggestParams::default().validated().is_none());
    }

    #[test]
    fn program_search_limit_is_clamped() {
        let params = ProgramSearchParams {
            q: Some("  blender ".to_string()),
            limit: Some(500),
        };
        assert_eq!(params.validated(), Some(("blender".to_string(), 50)));
        let short = ProgramSearchParams {
            q: Some("b".to_string()),
            limit: None,
        };
        assert_eq!(short.validated(), None);
    }

    #[test]
    fn compare_ids_keep_order_and_cap_at_three() {
        let params = CompareParams {
            ids: "9,x,4,7,1".to_string(),
        };
        assert_eq!(params.parsed_ids(), vec![9, 4, 7]);
        assert!(CompareParams::default().parsed_ids().is_empty());
    }

    #[test]
    fn recommend_request_rejects_unknown_categories() {
        let req = RecommendRequest {
            categories: vec!["gaming".to_string(), "knitting".to_string()],
            ..Default::default()
        };
        assert!(req.into_state().unwrap_err().contains("knitting"));

        let ok = RecommendRequest {
            categories: vec!["gaming".to_string(), "office".to_string()],
            ..Default::default()
        };
        let state = ok.into_state().unwrap();
        assert!((state.categories.get("office") - 50.0).abs() < 1e-9);
    }
}
