/// Application service shared by the HTTP API and the MCP tools.
///
/// The laptop and program lists are held as an in-process snapshot backed by
/// Redis and, on a double miss, the hosted catalog. Only the most recently
/// started fetch may replace the snapshot, and admin writes schedule one
/// debounced refresh no matter how many arrive in a burst.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use selector_common::admin::{
    ram_options, ssd_sizes, AdminLookups, BulkUpdate, FuzzyLaptopInsert, LaptopPatch,
    LaptopRecord,
};
use selector_common::api::{
    CategoryListResponse, LaptopListResponse, ProgramSearchParams, ProgramSearchResponse,
    RecommendRequest, RecommendResponse, SoftwareBrowseRequest, SuggestParams, SuggestResponse,
    UserSpecs,
};
use selector_common::model::{LaptopRow, LookupItem, ProgramReq, CATEGORIES};
use selector_common::query_state::UrlState;
use selector_common::sequence::{Debouncer, LatestValue};
use selector_common::software::{browse, reference_catalog, BrowsedSoftware};
use selector_common::wizard::WizardState;

use crate::cache::CatalogCache;
use crate::error::AppError;
use crate::rate_limit::RateLimiter;
use crate::source::{CatalogSource, LookupTable};

/// Admin lookup searches need at least this many characters.
pub const MIN_LOOKUP_QUERY_CHARS: usize = 3;
pub const LOOKUP_SEARCH_LIMIT: usize = 50;

#[derive(Clone)]
pub struct CatalogSnapshot {
    pub laptops: Arc<Vec<LaptopRow>>,
    pub programs: Arc<Vec<ProgramReq>>,
    loaded_at: Instant,
}

#[derive(Clone)]
pub struct SelectorService {
    source: Arc<dyn CatalogSource>,
    cache: CatalogCache,
    snapshot: Arc<LatestValue<CatalogSnapshot>>,
    refresh: Debouncer,
    snapshot_ttl: Duration,
    limiter: Option<RateLimiter>,
    fuzzy_threshold: f64,
}

impl SelectorService {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        cache: CatalogCache,
        snapshot_ttl: Duration,
        limiter: Option<RateLimiter>,
        fuzzy_threshold: f64,
    ) -> Self {
        Self {
            source,
            cache,
            snapshot: Arc::new(LatestValue::new()),
            refresh: Debouncer::default(),
            snapshot_ttl,
            limiter,
            fuzzy_threshold,
        }
    }

    async fn gate(&self) -> Result<(), AppError> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }
        Ok(())
    }

    // --- Catalog snapshot ---

    pub async fn snapshot(&self) -> Result<CatalogSnapshot, AppError> {
        if let Some(snap) = self.snapshot.get().await {
            if snap.loaded_at.elapsed() < self.snapshot_ttl {
                return Ok(snap);
            }
        }
        self.reload().await
    }

    async fn reload(&self) -> Result<CatalogSnapshot, AppError> {
        let ticket = self.snapshot.begin();

        let laptops = match self.cache.get_laptops().await {
            Some(cached) => cached,
            None => {
                let fresh = self.source.laptops().await?;
                self.cache.set_laptops(&fresh).await;
                fresh
            }
        };
        let programs = match self.cache.get_programs().await {
            Some(cached) => cached,
            None => {
                let fresh = self.source.programs().await?;
                self.cache.set_programs(&fresh).await;
                fresh
            }
        };

        let snap = CatalogSnapshot {
            laptops: Arc::new(laptops),
            programs: Arc::new(programs),
            loaded_at: Instant::now(),
        };
        if !self.snapshot.complete(ticket, snap.clone()).await {
            info!(ticket = ticket.value(), "newer catalog load in flight, result not stored");
        }
        Ok(snap)
    }

    /// Invalidate the cached laptop list and reload it once the burst of
    /// writes has settled.
    async fn schedule_refresh(&self) {
        self.cache.invalidate_laptops().await;
        let service = self.clone();
        self.refresh
            .submit(async move {
                service.cache.invalidate_laptops().await;
                match service.reload().await {
                    Ok(snap) => info!(laptops = snap.laptops.len(), "catalog snapshot refreshed"),
                    Err(e) => warn!(error = %e, "catalog refresh failed, keeping previous snapshot"),
                }
            })
            .await;
    }

    // --- Public reads ---

    pub fn categories(&self) -> CategoryListResponse {
        CategoryListResponse {
            categories: CATEGORIES.to_vec(),
        }
    }

    pub async fn recommend_state(&self, state: &WizardState) -> Result<RecommendResponse, AppError> {
        let snap = self.snapshot().await?;
        Ok(RecommendResponse {
            share_query: state.to_url().to_query(),
            recommendation: state.recommend(&snap.programs, &snap.laptops),
        })
    }

    /// Evaluate a shared-link query string.
    pub async fn recommend_query(&self, query: &str) -> Result<RecommendResponse, AppError> {
        let state = WizardState::from_url(&UrlState::parse(query));
        self.recommend_state(&state).await
    }

    pub async fn recommend(&self, request: RecommendRequest) -> Result<RecommendResponse, AppError> {
        let state = request.into_state().map_err(AppError::Validation)?;
        self.recommend_state(&state).await
    }

    /// Invalid type or a too-short query is answered with an empty list.
    pub async fn suggest(&self, params: &SuggestParams) -> Result<SuggestResponse, AppError> {
        self.gate().await?;
        let Some((kind, q, limit)) = params.validated() else {
            return Ok(SuggestResponse { items: Vec::new() });
        };
        let items = self.source.suggest(kind, &q, limit).await?;
        Ok(SuggestResponse { items })
    }

    pub async fn search_programs(
        &self,
        params: &ProgramSearchParams,
    ) -> Result<ProgramSearchResponse, AppError> {
        self.gate().await?;
        let Some((q, limit)) = params.validated() else {
            return Ok(ProgramSearchResponse { programs: Vec::new() });
        };
        if let Some(programs) = self.cache.get_program_search(&q, limit).await {
            return Ok(ProgramSearchResponse { programs });
        }
        let programs = self.source.search_programs(&q, limit).await?;
        self.cache.set_program_search(&q, limit, &programs).await;
        Ok(ProgramSearchResponse { programs })
    }

    pub async fn laptop(&self, id: i64) -> Result<LaptopRow, AppError> {
        self.source
            .laptop(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("laptop {id} not found")))
    }

    /// Rows come back in the order of `ids`; unknown ids are skipped.
    pub async fn compare(&self, ids: &[i64]) -> Result<LaptopListResponse, AppError> {
        if ids.is_empty() {
            return Ok(LaptopListResponse { laptops: Vec::new() });
        }
        let mut by_id: HashMap<i64, LaptopRow> = self
            .source
            .laptops_by_ids(ids)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let laptops = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        Ok(LaptopListResponse { laptops })
    }

    pub fn browse_software(&self, request: &SoftwareBrowseRequest) -> Vec<BrowsedSoftware> {
        browse(&reference_catalog(), &request.filter, request.machine)
    }

    pub async fn programs_by_specs(
        &self,
        specs: &UserSpecs,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        Ok(self.source.programs_by_specs(specs).await?)
    }

    // --- Admin ---

    pub async fn admin_laptops(&self, name: Option<&str>) -> Result<Vec<LaptopRecord>, AppError> {
        Ok(self.source.laptop_records(name).await?)
    }

    pub async fn admin_insert(&self, patch: LaptopPatch) -> Result<i64, AppError> {
        let patch = patch.resolved().map_err(AppError::Validation)?;
        if patch.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        let id = self
            .source
            .insert_laptop(&patch)
            .await?
            .ok_or_else(|| AppError::Internal("insert returned no row".to_string()))?;
        info!(id, "laptop inserted");
        self.schedule_refresh().await;
        Ok(id)
    }

    pub async fn admin_update(&self, id: i64, patch: LaptopPatch) -> Result<(), AppError> {
        let patch = patch.resolved().map_err(AppError::Validation)?;
        if patch.is_empty() {
            return Err(AppError::Validation("nothing to update".to_string()));
        }
        let touched = self.source.update_laptops(&[id], &patch).await?;
        if touched == 0 {
            return Err(AppError::NotFound(format!("laptop {id} not found")));
        }
        info!(id, "laptop updated");
        self.schedule_refresh().await;
        Ok(())
    }

    pub async fn admin_delete(&self, id: i64) -> Result<(), AppError> {
        let removed = self.source.delete_laptop(id).await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!("laptop {id} not found")));
        }
        info!(id, "laptop deleted");
        self.schedule_refresh().await;
        Ok(())
    }

    pub async fn admin_bulk_update(&self, bulk: BulkUpdate) -> Result<usize, AppError> {
        if bulk.ids.is_empty() {
            return Err(AppError::Validation("ids must not be empty".to_string()));
        }
        let patch = bulk.patch.resolved().map_err(AppError::Validation)?;
        if patch.is_empty() {
            return Err(AppError::Validation("nothing to update".to_string()));
        }
        let touched = self.source.update_laptops(&bulk.ids, &patch).await?;
        info!(requested = bulk.ids.len(), touched, "bulk laptop update");
        self.schedule_refresh().await;
        Ok(touched)
    }

    /// Insert by free-text component names; an omitted threshold uses the
    /// configured default.
    pub async fn admin_fuzzy_insert(
        &self,
        mut insert: FuzzyLaptopInsert,
    ) -> Result<serde_json::Value, AppError> {
        insert.threshold.get_or_insert(self.fuzzy_threshold);
        insert.validate().map_err(AppError::Validation)?;
        let created = self.source.insert_laptop_fuzzy(&insert).await?;
        info!(name = %insert.name, threshold = insert.threshold(), "laptop inserted by fuzzy names");
        self.schedule_refresh().await;
        Ok(created)
    }

    /// Picker contents. A failing brand lookup degrades to an empty list.
    pub async fn admin_lookups(&self) -> Result<AdminLookups, AppError> {
        let (cpus, gpus, rams, brands, ssd) = futures::join!(
            self.source.lookup(LookupTable::Cpus, None, None),
            self.source.lookup(LookupTable::Gpus, None, None),
            self.source.lookup(LookupTable::Rams, None, None),
            self.source.lookup(LookupTable::Brands, None, None),
            self.source.ssd_values(),
        );
        let rams = rams?;
        let brands = brands.unwrap_or_else(|e| {
            warn!(error = %e, "brand lookup failed, continuing without brands");
            Vec::new()
        });

        Ok(AdminLookups {
            cpus: cpus?,
            gpus: gpus?,
            ram_options: ram_options(&rams),
            rams,
            brands,
            ssd_sizes: ssd_sizes(ssd?),
        })
    }

    pub async fn admin_lookup_search(
        &self,
        table: LookupTable,
        q: &str,
    ) -> Result<Vec<LookupItem>, AppError> {
        if table == LookupTable::Rams {
            return Err(AppError::Validation("rams cannot be searched".to_string()));
        }
        let q = q.trim();
        if q.chars().count() < MIN_LOOKUP_QUERY_CHARS {
            return Ok(Vec::new());
        }
        Ok(self
            .source
            .lookup(table, Some(q), Some(LOOKUP_SEARCH_LIMIT))
            .await?)
    }
}
