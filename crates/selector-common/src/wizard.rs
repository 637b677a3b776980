/// Serializable state of one wizard session and the pure reducer that moves it.
///
/// The state is the single source of truth; [`WizardState::to_url`] and
/// [`WizardState::from_url`] are the one-way adapters to the query string.
use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{is_known_category, LaptopRow, ProgramReq, Requirement};
use crate::query_state::{UrlState, FIRST_STEP, LAST_STEP};
use crate::requirements::{aggregate, programs_in_categories, selected_programs};
use crate::results::ResultFilters;
use crate::scoring::{score_all, ResourceWeights, ResultItem};
use crate::weights::CategoryWeights;

/// At most this many laptops can be queued for side-by-side comparison.
pub const MAX_COMPARE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WizardState {
    pub step: u8,
    pub categories: CategoryWeights,
    pub program_ids: Vec<i64>,
    pub filters: ResultFilters,
    pub compare_ids: Vec<i64>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: FIRST_STEP,
            categories: CategoryWeights::new(),
            program_ids: Vec::new(),
            filters: ResultFilters::default(),
            compare_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    GoTo { step: u8 },
    ToggleCategory { id: String },
    RemoveCategory { id: String },
    SetWeight { id: String, value: f64 },
    ToggleProgram { id: i64 },
    AddProgram { id: i64 },
    RemoveProgram { id: i64 },
    SetFilters { filters: ResultFilters },
    ToggleCompare { id: i64 },
    ClearCompare,
    Restart,
}

/// Everything the results step shows for a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub requirement: Requirement,
    pub resource_weights: ResourceWeights,
    pub results: Vec<ResultItem>,
}

impl WizardState {
    pub fn apply(mut self, action: Action) -> Self {
        match action {
            Action::GoTo { step } => {
                self.step = step.clamp(FIRST_STEP, LAST_STEP);
            }
            Action::ToggleCategory { id } => {
                if is_known_category(&id) {
                    self.categories.toggle(&id);
                }
            }
            Action::RemoveCategory { id } => self.categories.remove(&id),
            Action::SetWeight { id, value } => self.categories.set_weight(&id, value),
            Action::ToggleProgram { id } => {
                if self.program_ids.contains(&id) {
                    self.program_ids.retain(|x| *x != id);
                } else {
                    self.program_ids.push(id);
                }
            }
            Action::AddProgram { id } => {
                if !self.program_ids.contains(&id) {
                    self.program_ids.push(id);
                }
            }
            Action::RemoveProgram { id } => self.program_ids.retain(|x| *x != id),
            Action::SetFilters { filters } => self.filters = filters,
            Action::ToggleCompare { id } => {
                if self.compare_ids.contains(&id) {
                    self.compare_ids.retain(|x| *x != id);
                } else if self.compare_ids.len() < MAX_COMPARE {
                    self.compare_ids.push(id);
                }
            }
            Action::ClearCompare => self.compare_ids.clear(),
            Action::Restart => return Self::default(),
        }
        self
    }

    /// Hydrate from a decoded query string. Unknown categories are dropped and
    /// the remaining weights renormalised.
    pub fn from_url(url: &UrlState) -> Self {
        let categories: Vec<String> = url
            .categories
            .iter()
            .filter(|c| is_known_category(c))
            .cloned()
            .collect();
        let hint: HashMap<String, f64> = categories
            .iter()
            .filter_map(|c| url.weight_of(c).map(|w| (c.clone(), w)))
            .collect();

        Self {
            step: url.step,
            categories: CategoryWeights::from_pairs(&categories, &hint),
            program_ids: url.program_ids.clone(),
            filters: ResultFilters {
                min_price: url.min_price,
                max_price: url.max_price,
                min_ssd: url.min_ssd,
                sort: url.sort,
            },
            compare_ids: Vec::new(),
        }
    }

    /// Weights are rounded to two decimals here and to whole numbers by the encoder.
    pub fn to_url(&self) -> UrlState {
        UrlState {
            step: self.step,
            categories: self.categories.selected().to_vec(),
            weights: self
                .categories
                .iter()
                .map(|(id, w)| (id.to_string(), (w * 100.0).round() / 100.0))
                .collect(),
            program_ids: self.program_ids.clone(),
            min_price: self.filters.min_price,
            max_price: self.filters.max_price,
            min_ssd: self.filters.min_ssd,
            sort: self.filters.sort,
        }
    }

    /// Run the full pipeline for this state: category pool, aggregate target,
    /// scoring, then the result filters and ordering.
    pub fn recommend(&self, programs: &[ProgramReq], laptops: &[LaptopRow]) -> Recommendation {
        let pool = programs_in_categories(programs, &self.categories);
        let titles = selected_programs(programs, &self.program_ids);
        let requirement = aggregate(&titles, &self.categories, &pool);
        let resource_weights = ResourceWeights::for_categories(&self.categories);
        let scored = score_all(laptops, &requirement, resource_weights, &titles);

        Recommendation {
            requirement,
            resource_weights,
            results: self.filters.apply(&scored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryTags;
    use crate::results::SortKey;

    fn laptop(id: i64, cpu: f64, ram: f64, gpu: f64, price: f64) -> LaptopRow {
        LaptopRow {
            id,
            name: format!("l{id}"),
            image_url: None,
            purchase_url: None,
            price_eur: Some(price),
            ssd_size_gb: Some(512.0),
            cpu_name: None,
            cpu_score: Some(cpu),
            ram_gb: Some(ram),
            gpu_name: None,
            gpu_score: Some(gpu),
        }
    }

    #[test]
    fn compare_list_is_capped_at_three() {
        let mut state = WizardState::default();
        for id in [1, 2, 3, 4] {
            state = state.apply(Action::ToggleCompare { id });
        }
        assert_eq!(state.compare_ids, vec![1, 2, 3]);
        state = state.apply(Action::ToggleCompare { id: 2 });
        assert_eq!(state.compare_ids, vec![1, 3]);
        state = state.apply(Action::ClearCompare);
        assert!(state.compare_ids.is_empty());
    }

    #[test]
    fn programs_toggle_and_add_without_duplicates() {
        let state = WizardState::default()
            .apply(Action::AddProgram { id: 5 })
            .apply(Action::AddProgram { id: 5 })
            .apply(Action::ToggleProgram { id: 6 })
            .apply(Action::ToggleProgram { id: 5 });
        assert_eq!(state.program_ids, vec![6]);
        let state = state.apply(Action::RemoveProgram { id: 6 });
        assert!(state.program_ids.is_empty());
    }

    #[test]
    fn unknown_categories_and_steps_are_rejected() {
        let state = WizardState::default()
            .apply(Action::ToggleCategory { id: "cooking".to_string() })
            .apply(Action::GoTo { step: 9 });
        assert!(state.categories.is_empty());
        assert_eq!(state.step, LAST_STEP);
    }

    #[test]
    fn restart_resets_everything() {
        let state = WizardState::default()
            .apply(Action::ToggleCategory { id: "gaming".to_string() })
            .apply(Action::GoTo { step: 3 })
            .apply(Action::ToggleCompare { id: 1 })
            .apply(Action::Restart);
        assert_eq!(state, WizardState::default());
    }

    #[test]
    fn url_round_trip_keeps_selection() {
        let state = WizardState::default()
            .apply(Action::ToggleCategory { id: "gaming".to_string() })
            .apply(Action::ToggleCategory { id: "office".to_string() })
            .apply(Action::SetWeight { id: "gaming".to_string(), value: 70.0 })
            .apply(Action::AddProgram { id: 9 })
            .apply(Action::GoTo { step: 4 });

        let query = state.to_url().to_query();
        let restored = WizardState::from_url(&UrlState::parse(&query));
        assert_eq!(restored.step, 4);
        assert_eq!(restored.program_ids, vec![9]);
        assert!((restored.categories.get("gaming") - 70.0).abs() < 1e-9);
        assert!((restored.categories.get("office") - 30.0).abs() < 1e-9);
    }

    #[test]
    fn hydration_drops_unknown_categories() {
        let url = UrlState::parse("c=gaming,cooking&w=gaming:40,cooking:60");
        let state = WizardState::from_url(&url);
        assert_eq!(state.categories.selected(), ["gaming".to_string()]);
        assert!((state.categories.get("gaming") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn recommend_runs_the_whole_pipeline() {
        let programs = vec![ProgramReq {
            id: 1,
            name: "Game".to_string(),
            category: Some(CategoryTags::One("gaming".to_string())),
            cpu_min_score: Some(50.0),
            cpu_rec_score: Some(100.0),
            ram_min_gb: Some(8.0),
            ram_rec_gb: Some(16.0),
            gpu_min_score: Some(50.0),
            gpu_rec_score: Some(100.0),
        }];
        let laptops = vec![
            laptop(1, 100.0, 16.0, 100.0, 1500.0),
            laptop(2, 40.0, 8.0, 40.0, 600.0),
        ];
        let state = WizardState::default()
            .apply(Action::ToggleCategory { id: "gaming".to_string() })
            .apply(Action::AddProgram { id: 1 });

        let rec = state.recommend(&programs, &laptops);
        assert_eq!(rec.requirement, Requirement { cpu: 100.0, ram: 16.0, gpu: 100.0 });
        assert_eq!(rec.resource_weights, ResourceWeights::GPU_HEAVY);
        assert_eq!(rec.results[0].laptop.id, 1);
        assert_eq!(rec.results[0].score, 100.0);
        // 40*.3 + 50*.3 + 40*.4 = 43, halved for the failed minimum
        assert_eq!(rec.results[1].score, 22.0);

        let cheap_first = state.apply(Action::SetFilters {
            filters: ResultFilters {
                sort: SortKey::PriceAsc,
                ..Default::default()
            },
        });
        let rec = cheap_first.recommend(&programs, &laptops);
        assert_eq!(rec.results[0].laptop.id, 2);
    }
}
