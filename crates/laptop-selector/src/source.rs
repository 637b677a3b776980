/// Read and write access to the hosted catalog.
///
/// The service talks to this trait so handlers and tools can be exercised
/// against an in-memory catalog. [`CatalogClient`] is the production
/// implementation and owns every table, view and procedure name.
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use selector_common::admin::{FuzzyLaptopInsert, LaptopPatch, LaptopRecord};
use selector_common::api::{HwKind, UserSpecs};
use selector_common::catalog::{CatalogClient, Query};
use selector_common::error::CatalogError;
use selector_common::model::{LaptopRow, LookupItem, ProgramReq};

const LAPTOPS_VIEW: &str = "v_laptops_expanded";
const PROGRAMS_VIEW: &str = "v_programs_requirements";
const LAPTOPS_TABLE: &str = "laptops";
const FUZZY_INSERT_FN: &str = "insert_laptop_by_names_fuzzy";
const PROGRAMS_BY_SPECS_FN: &str = "programs_by_user_specs";
const SSD_SCAN_LIMIT: usize = 1000;

/// `{id, name}` lookup tables referenced by `laptops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    Cpus,
    Gpus,
    Rams,
    Brands,
}

impl LookupTable {
    pub fn table(self) -> &'static str {
        match self {
            Self::Cpus => "cpus",
            Self::Gpus => "gpus",
            Self::Rams => "rams",
            Self::Brands => "brands",
        }
    }
}

impl fmt::Display for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for LookupTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpus" => Ok(Self::Cpus),
            "gpus" => Ok(Self::Gpus),
            "rams" => Ok(Self::Rams),
            "brands" => Ok(Self::Brands),
            other => Err(format!("unknown lookup table: {other}")),
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn laptops(&self) -> Result<Vec<LaptopRow>, CatalogError>;
    async fn programs(&self) -> Result<Vec<ProgramReq>, CatalogError>;
    async fn laptop(&self, id: i64) -> Result<Option<LaptopRow>, CatalogError>;
    /// Rows for `ids` in no particular order; unknown ids are absent.
    async fn laptops_by_ids(&self, ids: &[i64]) -> Result<Vec<LaptopRow>, CatalogError>;
    async fn search_programs(&self, q: &str, limit: u32) -> Result<Vec<ProgramReq>, CatalogError>;
    async fn suggest(&self, kind: HwKind, q: &str, limit: u32) -> Result<Vec<Value>, CatalogError>;
    async fn programs_by_specs(&self, specs: &UserSpecs) -> Result<Vec<Value>, CatalogError>;

    /// Raw `laptops` rows, newest first.
    async fn laptop_records(&self, name: Option<&str>) -> Result<Vec<LaptopRecord>, CatalogError>;
    async fn insert_laptop(&self, patch: &LaptopPatch) -> Result<Option<i64>, CatalogError>;
    async fn update_laptops(&self, ids: &[i64], patch: &LaptopPatch) -> Result<usize, CatalogError>;
    async fn delete_laptop(&self, id: i64) -> Result<usize, CatalogError>;
    async fn insert_laptop_fuzzy(&self, insert: &FuzzyLaptopInsert) -> Result<Value, CatalogError>;
    async fn lookup(
        &self,
        table: LookupTable,
        name_contains: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<LookupItem>, CatalogError>;
    /// `ssd_size_gb` of every laptop that has one.
    async fn ssd_values(&self) -> Result<Vec<Option<f64>>, CatalogError>;
}

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

#[derive(Deserialize)]
struct SsdRow {
    ssd_size_gb: Option<f64>,
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn laptops(&self) -> Result<Vec<LaptopRow>, CatalogError> {
        self.select(LAPTOPS_VIEW, &Query::new().select("*")).await
    }

    async fn programs(&self) -> Result<Vec<ProgramReq>, CatalogError> {
        self.select(PROGRAMS_VIEW, &Query::new().select("*")).await
    }

    async fn laptop(&self, id: i64) -> Result<Option<LaptopRow>, CatalogError> {
        let rows: Vec<LaptopRow> = self
            .select(LAPTOPS_VIEW, &Query::new().select("*").eq("id", id).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn laptops_by_ids(&self, ids: &[i64]) -> Result<Vec<LaptopRow>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(LAPTOPS_VIEW, &Query::new().select("*").in_ids("id", ids))
            .await
    }

    async fn search_programs(&self, q: &str, limit: u32) -> Result<Vec<ProgramReq>, CatalogError> {
        let query = Query::new()
            .select("*")
            .ilike_contains("name", q)
            .order("name", true)
            .limit(limit as usize);
        self.select(PROGRAMS_VIEW, &query).await
    }

    async fn suggest(&self, kind: HwKind, q: &str, limit: u32) -> Result<Vec<Value>, CatalogError> {
        let args = serde_json::json!({ "p_q": q, "p_limit": limit });
        self.rpc(kind.suggest_function(), &args).await
    }

    async fn programs_by_specs(&self, specs: &UserSpecs) -> Result<Vec<Value>, CatalogError> {
        self.rpc(PROGRAMS_BY_SPECS_FN, &specs.rpc_args()).await
    }

    async fn laptop_records(&self, name: Option<&str>) -> Result<Vec<LaptopRecord>, CatalogError> {
        let mut query = Query::new().select("*");
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            query = query.ilike_contains("name", name.trim());
        }
        self.select(LAPTOPS_TABLE, &query.order("id", false)).await
    }

    async fn insert_laptop(&self, patch: &LaptopPatch) -> Result<Option<i64>, CatalogError> {
        let rows: Vec<IdRow> = self.insert(LAPTOPS_TABLE, patch, "id").await?;
        Ok(rows.first().map(|r| r.id))
    }

    async fn update_laptops(&self, ids: &[i64], patch: &LaptopPatch) -> Result<usize, CatalogError> {
        let filter = match ids {
            [id] => Query::new().eq("id", id),
            _ => Query::new().in_ids("id", ids),
        };
        self.update(LAPTOPS_TABLE, &filter, patch).await
    }

    async fn delete_laptop(&self, id: i64) -> Result<usize, CatalogError> {
        self.delete(LAPTOPS_TABLE, &Query::new().eq("id", id)).await
    }

    async fn insert_laptop_fuzzy(&self, insert: &FuzzyLaptopInsert) -> Result<Value, CatalogError> {
        self.rpc_mutating(FUZZY_INSERT_FN, &insert.rpc_args()).await
    }

    async fn lookup(
        &self,
        table: LookupTable,
        name_contains: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<LookupItem>, CatalogError> {
        let mut query = Query::new().select("id,name");
        if let Some(needle) = name_contains {
            query = query.ilike_contains("name", needle);
        }
        query = query.order("name", true);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        self.select(table.table(), &query).await
    }

    async fn ssd_values(&self) -> Result<Vec<Option<f64>>, CatalogError> {
        let query = Query::new()
            .select("ssd_size_gb")
            .not_null("ssd_size_gb")
            .order("ssd_size_gb", true)
            .limit(SSD_SCAN_LIMIT);
        let rows: Vec<SsdRow> = self.select(LAPTOPS_TABLE, &query).await?;
        Ok(rows.into_iter().map(|r| r.ssd_size_gb).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_tables_parse_from_path_segments() {
        assert_eq!("cpus".parse::<LookupTable>(), Ok(LookupTable::Cpus));
        assert_eq!("brands".parse::<LookupTable>(), Ok(LookupTable::Brands));
        assert!("laptops".parse::<LookupTable>().is_err());
        assert_eq!(LookupTable::Rams.to_string(), "rams");
    }
}
