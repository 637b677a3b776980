/// Importance weights of the selected usage categories.
///
/// With at least one category selected the weights always sum to 100. Every
/// mutation restores that invariant; divisions fall back to a denominator of 1
/// so an empty or all-zero selection never divides by zero.
use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const TOTAL: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryWeights {
    /// Selected category ids in selection order.
    selected: Vec<String>,
    weights: HashMap<String, f64>,
}

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a selection plus weights recovered from elsewhere (the URL).
    /// Categories without a hint start at `100 / count`; the result is renormalised.
    pub fn from_pairs(selected: &[String], hint: &HashMap<String, f64>) -> Self {
        let mut out = Self::new();
        for id in selected {
            if !out.selected.contains(id) {
                out.selected.push(id.clone());
            }
        }
        let equal = TOTAL / denominator(out.selected.len() as f64);
        for id in &out.selected {
            let value = hint.get(id).copied().unwrap_or(equal);
            out.weights.insert(id.clone(), value.max(0.0));
        }
        out.normalize();
        out
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|c| c == id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Weight of `id` in percent, 0 when not selected.
    pub fn get(&self, id: &str) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    /// Weight of `id` as a 0..1 fraction.
    pub fn fraction(&self, id: &str) -> f64 {
        self.get(id) / TOTAL
    }

    pub fn total(&self) -> f64 {
        self.selected.iter().map(|id| self.get(id)).sum()
    }

    /// `(id, weight)` pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.selected.iter().map(|id| (id.as_str(), self.get(id)))
    }

    /// Add `id` if absent, remove it otherwise.
    ///
    /// Adding resets every selected category to `100 / count`, discarding manual
    /// adjustments. Removing keeps the others' proportions and renormalises.
    pub fn toggle(&mut self, id: &str) {
        if self.is_selected(id) {
            self.remove(id);
            return;
        }
        self.selected.push(id.to_string());
        let equal = TOTAL / self.selected.len() as f64;
        self.weights = self
            .selected
            .iter()
            .map(|c| (c.clone(), equal))
            .collect();
    }

    /// Drop `id` from the selection and renormalise the remainder.
    pub fn remove(&mut self, id: &str) {
        self.selected.retain(|c| c != id);
        self.weights.remove(id);
        self.normalize();
    }

    /// Pin `id` to `value` percent and rescale the other selected categories
    /// proportionally so the total stays at 100. When the others are all zero
    /// the remainder is split evenly. Unselected ids are ignored.
    pub fn set_weight(&mut self, id: &str, value: f64) {
        if !self.is_selected(id) {
            return;
        }
        let value = if value.is_finite() { value.clamp(0.0, TOTAL) } else { 0.0 };
        let others: Vec<String> = self.selected.iter().filter(|c| *c != id).cloned().collect();
        let remainder = (TOTAL - value).max(0.0);
        let current_other_sum: f64 = others.iter().map(|c| self.get(c)).sum();

        self.weights.insert(id.to_string(), value);
        if others.is_empty() {
            return;
        }

        if current_other_sum == 0.0 {
            let each = remainder / others.len() as f64;
            for c in others {
                self.weights.insert(c, each);
            }
        } else {
            for c in others {
                let share = self.get(&c) / current_other_sum;
                self.weights.insert(c, remainder * share);
            }
        }
    }

    /// Rescale so the selected weights sum to 100.
    fn normalize(&mut self) {
        self.weights.retain(|k, _| self.selected.contains(k));
        let sum = denominator(self.total());
        for c in &self.selected {
            let value = self.weights.get(c).copied().unwrap_or(0.0);
            self.weights.insert(c.clone(), value / sum * TOTAL);
        }
    }
}

fn denominator(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        x
    }
}
