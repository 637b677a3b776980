/// Compatibility scoring of candidate laptops against a requirement target.
///
/// Pure and synchronous: the same inputs always produce the same ranking.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{LaptopRow, ProgramReq, Requirement};
use crate::weights::CategoryWeights;

pub const MAX_SCORE: f64 = 100.0;
/// Multiplier applied when any selected title is rated [`Verdict::Poor`].
pub const POOR_PENALTY: f64 = 0.5;

/// Relative importance of each resource in the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceWeights {
    pub cpu: f64,
    pub ram: f64,
    pub gpu: f64,
}

impl ResourceWeights {
    pub const BALANCED: Self = Self { cpu: 0.4, ram: 0.4, gpu: 0.2 };
    pub const GPU_HEAVY: Self = Self { cpu: 0.3, ram: 0.3, gpu: 0.4 };

    /// GPU-bound workloads (gaming, graphics) shift weight onto the GPU.
    pub fn for_categories(weights: &CategoryWeights) -> Self {
        if weights.is_selected("gaming") || weights.is_selected("graphics") {
            Self::GPU_HEAVY
        } else {
            Self::BALANCED
        }
    }
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self::BALANCED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Meets every recommended value.
    Excellent,
    /// Meets every minimum value.
    Acceptable,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgramVerdict {
    pub name: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultItem {
    pub laptop: LaptopRow,
    /// Integer score in `0..=100`.
    pub score: f64,
    pub analysis: Vec<ProgramVerdict>,
}

/// `x` as a percentage of `requirement`; a non-positive requirement counts as 1.
pub fn normalized(x: f64, requirement: f64) -> f64 {
    let denom = if requirement > 0.0 { requirement } else { 1.0 };
    x / denom * 100.0
}

pub fn verdict(laptop: &LaptopRow, program: &ProgramReq) -> Verdict {
    if program.recommended().satisfied_by(laptop) {
        Verdict::Excellent
    } else if program.minimum().satisfied_by(laptop) {
        Verdict::Acceptable
    } else {
        Verdict::Poor
    }
}

/// Weighted score before any penalty, rounding or clamping.
pub fn raw_score(laptop: &LaptopRow, target: &Requirement, weights: ResourceWeights) -> f64 {
    normalized(laptop.cpu(), target.cpu) * weights.cpu
        + normalized(laptop.ram(), target.ram) * weights.ram
        + normalized(laptop.gpu(), target.gpu) * weights.gpu
}

/// Score one laptop, including per-title verdicts when titles were chosen.
pub fn score_laptop(
    laptop: &LaptopRow,
    target: &Requirement,
    weights: ResourceWeights,
    titles: &[&ProgramReq],
) -> ResultItem {
    let mut score = raw_score(laptop, target, weights);

    let analysis: Vec<ProgramVerdict> = titles
        .iter()
        .map(|p| ProgramVerdict {
            name: p.name.clone(),
            verdict: verdict(laptop, p),
        })
        .collect();
    if analysis.iter().any(|a| a.verdict == Verdict::Poor) {
        score *= POOR_PENALTY;
    }

    ResultItem {
        laptop: laptop.clone(),
        score: clamp_score(score),
        analysis,
    }
}

/// Score every laptop and rank by descending score.
pub fn score_all(
    laptops: &[LaptopRow],
    target: &Requirement,
    weights: ResourceWeights,
    titles: &[&ProgramReq],
) -> Vec<ResultItem> {
    let mut results: Vec<ResultItem> = laptops
        .iter()
        .map(|l| score_laptop(l, target, weights, titles))
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results
}

fn clamp_score(score: f64) -> f64 {
    if !score.is_finite() {
        return if score == f64::INFINITY { MAX_SCORE } else { 0.0 };
    }
    score.round().clamp(0.0, MAX_SCORE)
}
