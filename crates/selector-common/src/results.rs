use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scoring::ResultItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ScoreDesc,
    PriceAsc,
    PriceDesc,
    RamDesc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScoreDesc => "score_desc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::RamDesc => "ram_desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score_desc" => Ok(Self::ScoreDesc),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "ram_desc" => Ok(Self::RamDesc),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Price/storage bounds and ordering applied on top of scored results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultFilters {
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_ssd: Option<f64>,
    #[serde(default)]
    pub sort: SortKey,
}

impl ResultFilters {
    /// Laptops without a price never pass a price bound; a missing SSD size counts as 0.
    pub fn matches(&self, item: &ResultItem) -> bool {
        let price = item.laptop.price_eur;
        if let Some(min) = self.min_price {
            if !price.is_some_and(|p| p >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if !price.is_some_and(|p| p <= max) {
                return false;
            }
        }
        if let Some(min_ssd) = self.min_ssd {
            if item.laptop.ssd_size_gb.unwrap_or(0.0) < min_ssd {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, results: &[ResultItem]) -> Vec<ResultItem> {
        let mut out: Vec<ResultItem> = results.iter().filter(|r| self.matches(r)).cloned().collect();
        sort_results(&mut out, self.sort);
        out
    }
}

/// Stable re-sort of already scored results. Scores are never recomputed.
pub fn sort_results(results: &mut [ResultItem], key: SortKey) {
    match key {
        SortKey::ScoreDesc => results.sort_by(|a, b| b.score.total_cmp(&a.score)),
        SortKey::PriceAsc => results.sort_by(|a, b| {
            cmp_missing_last(a.laptop.price_eur, b.laptop.price_eur, |x, y| x.total_cmp(&y))
        }),
        SortKey::PriceDesc => results.sort_by(|a, b| {
            cmp_missing_last(a.laptop.price_eur, b.laptop.price_eur, |x, y| y.total_cmp(&x))
        }),
        SortKey::RamDesc => results.sort_by(|a, b| {
            b.laptop.ram_gb.unwrap_or(0.0).total_cmp(&a.laptop.ram_gb.unwrap_or(0.0))
        }),
    }
}

fn cmp_missing_last(
    a: Option<f64>,
    b: Option<f64>,
    present: impl Fn(f64, f64) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => present(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
