/// Payloads and parsing helpers for maintaining the `laptops` table.
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::LookupItem;

/// Similarity threshold used when free-text component names are resolved to ids.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.3;

static FIRST_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// A row of the raw `laptops` table (foreign keys, not joined names).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LaptopRecord {
    pub id: i64,
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default)]
    pub price_eur: Option<f64>,
    #[serde(default)]
    pub ram_gb: Option<f64>,
    #[serde(default)]
    pub ssd_size_gb: Option<f64>,
    #[serde(default)]
    pub cpu_id: Option<i64>,
    #[serde(default)]
    pub gpu_id: Option<i64>,
    #[serde(default)]
    pub brand_id: Option<i64>,
}

/// Column values to write. `None` fields are left out of the request body.
///
/// `ssd_text` accepts human input such as "512GB" or "1 TB" and wins over
/// `ssd_size_gb` once resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LaptopPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_eur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssd_size_gb: Option<f64>,
    #[serde(default, skip_serializing)]
    pub ssd_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<i64>,
}

impl LaptopPatch {
    /// Fold `ssd_text` into `ssd_size_gb`. Unparsable text is an error so a
    /// typo never silently clears the column.
    pub fn resolved(mut self) -> Result<Self, String> {
        if let Some(text) = self.ssd_text.take() {
            let gb = parse_ssd_gb(&text).ok_or_else(|| format!("unrecognised SSD size: {text}"))?;
            self.ssd_size_gb = Some(gb as f64);
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image_url.is_none()
            && self.purchase_url.is_none()
            && self.price_eur.is_none()
            && self.ram_gb.is_none()
            && self.ssd_size_gb.is_none()
            && self.ssd_text.is_none()
            && self.cpu_id.is_none()
            && self.gpu_id.is_none()
            && self.brand_id.is_none()
    }
}

/// Same patch applied to several rows at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BulkUpdate {
    pub ids: Vec<i64>,
    pub patch: LaptopPatch,
}

/// Insert using free-text component names; the database resolves them to ids
/// by name similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FuzzyLaptopInsert {
    pub name: String,
    pub cpu_name: String,
    pub gpu_name: String,
    pub ram_name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub ssd_size_gb: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl FuzzyLaptopInsert {
    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        for (field, value) in [
            ("cpu_name", &self.cpu_name),
            ("gpu_name", &self.gpu_name),
            ("ram_name", &self.ram_name),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        let t = self.threshold();
        if !(t > 0.0 && t <= 1.0) {
            return Err(format!("threshold must be in (0, 1], got {t}"));
        }
        Ok(())
    }

    /// Argument object for the `insert_laptop_by_names_fuzzy` procedure.
    pub fn rpc_args(&self) -> serde_json::Value {
        serde_json::json!({
            "p_name": self.name.trim(),
            "p_cpu_name": self.cpu_name.trim(),
            "p_gpu_name": self.gpu_name.trim(),
            "p_ram_name": self.ram_name.trim(),
            "p_price": self.price,
            "p_ssd_size_gb": self.ssd_size_gb,
            "p_image_url": self.image_url,
            "p_purchase_url": self.purchase_url,
            "p_threshold": self.threshold(),
        })
    }
}

/// Everything an editor needs to fill its pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdminLookups {
    pub cpus: Vec<LookupItem>,
    pub gpus: Vec<LookupItem>,
    pub rams: Vec<LookupItem>,
    pub brands: Vec<LookupItem>,
    pub ssd_sizes: Vec<u32>,
    pub ram_options: Vec<u32>,
}

/// "512GB" → 512, "1tb" → 1024, "1.5 TB" → 1536.
pub fn parse_ssd_gb(text: &str) -> Option<u32> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let digits: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let n: f64 = digits.parse().ok().filter(|n: &f64| n.is_finite())?;
    let gb = if lowered.contains("tb") { n * 1024.0 } else { n };
    Some(gb.round() as u32)
}

/// First integer in a RAM lookup name ("16GB DDR5" → 16). Zero when absent.
pub fn ram_gb_from_name(name: &str) -> u32 {
    FIRST_INT_RE
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Distinct positive RAM sizes offered by the lookup table, ascending.
pub fn ram_options(rams: &[LookupItem]) -> Vec<u32> {
    rams.iter()
        .map(|r| ram_gb_from_name(&r.name))
        .filter(|n| *n > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct SSD sizes already present in the catalogue, ascending.
pub fn ssd_sizes(values: impl IntoIterator<Item = Option<f64>>) -> Vec<u32> {
    values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u32)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
