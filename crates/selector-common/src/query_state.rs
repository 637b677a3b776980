/// Compact query-string encoding of a wizard session, so a session can be
/// shared as a link and survives back/forward navigation.
///
/// Keys:
/// - `s`    step (1..=4, default 1)
/// - `c`    selected categories, comma separated
/// - `p`    selected program ids, comma separated
/// - `w`    weights as `category:value` pairs, comma separated
/// - `min`  / `max` price bounds, `ssd` minimum SSD size
/// - `sort` result ordering (default `score_desc`)
///
/// Defaults are omitted when encoding.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::results::SortKey;

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UrlState {
    pub step: u8,
    pub categories: Vec<String>,
    /// `(category, percent)` in encoding order.
    pub weights: Vec<(String, f64)>,
    pub program_ids: Vec<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_ssd: Option<f64>,
    pub sort: SortKey,
}

impl Default for UrlState {
    fn default() -> Self {
        Self {
            step: FIRST_STEP,
            categories: Vec::new(),
            weights: Vec::new(),
            program_ids: Vec::new(),
            min_price: None,
            max_price: None,
            min_ssd: None,
            sort: SortKey::ScoreDesc,
        }
    }
}

impl UrlState {
    /// Decode a raw query string (with or without the leading `?`).
    /// Malformed pieces are dropped rather than rejected.
    pub fn parse(query: &str) -> Self {
        let pairs = decode_pairs(query.trim_start_matches('?'));
        let get = |key: &str| -> Option<&str> {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let step = get("s")
            .and_then(|s| s.trim().parse::<u8>().ok())
            .filter(|s| (FIRST_STEP..=LAST_STEP).contains(s))
            .unwrap_or(FIRST_STEP);

        let categories = split_list(get("c").unwrap_or(""))
            .map(str::to_string)
            .collect();

        let program_ids = split_list(get("p").unwrap_or(""))
            .filter_map(|x| x.trim().parse::<i64>().ok())
            .collect();

        let weights = split_list(get("w").unwrap_or(""))
            .filter_map(|pair| {
                let mut parts = pair.split(':');
                let key = parts.next().filter(|k| !k.is_empty())?;
                let value = parse_number(parts.next()?)?;
                Some((key.to_string(), value))
            })
            .collect();

        let sort = get("sort")
            .and_then(|s| s.parse::<SortKey>().ok())
            .unwrap_or_default();

        Self {
            step,
            categories,
            weights,
            program_ids,
            min_price: get("min").and_then(read_num_or_none),
            max_price: get("max").and_then(read_num_or_none),
            min_ssd: get("ssd").and_then(read_num_or_none),
            sort,
        }
    }

    /// Encode to a query string without the leading `?`. Empty when every field
    /// holds its default.
    pub fn to_query(&self) -> String {
        let mut out: Vec<(&str, String)> = Vec::new();

        if self.step != FIRST_STEP {
            out.push(("s", self.step.to_string()));
        }
        if !self.categories.is_empty() {
            out.push(("c", self.categories.join(",")));
        }
        if !self.program_ids.is_empty() {
            let ids: Vec<String> = self.program_ids.iter().map(i64::to_string).collect();
            out.push(("p", ids.join(",")));
        }
        let weights: Vec<String> = self
            .weights
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| format!("{k}:{}", v.round()))
            .collect();
        if !weights.is_empty() {
            out.push(("w", weights.join(",")));
        }
        if let Some(v) = self.min_price {
            out.push(("min", v.to_string()));
        }
        if let Some(v) = self.max_price {
            out.push(("max", v.to_string()));
        }
        if let Some(v) = self.min_ssd {
            out.push(("ssd", v.to_string()));
        }
        if self.sort != SortKey::ScoreDesc {
            out.push(("sort", self.sort.to_string()));
        }

        out.iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn weight_of(&self, category: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|(k, _)| k == category)
            .map(|(_, v)| *v)
    }
}

fn decode_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let (k, v) = piece.split_once('=').unwrap_or((piece, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').filter(|x| !x.is_empty())
}

/// Blank counts as zero inside weight pairs.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn read_num_or_none(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
