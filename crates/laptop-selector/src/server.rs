use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use selector_common::api::{
    CategoryListResponse, LaptopIdParams, LaptopListResponse, ProgramSearchParams,
    ProgramSearchResponse, RecommendRequest, RecommendResponse, SoftwareBrowseRequest,
    SuggestParams, SuggestResponse,
};
use selector_common::model::LaptopRow;
use selector_common::software::BrowsedSoftware;
use selector_common::wizard::MAX_COMPARE;

use crate::error::AppError;
use crate::service::SelectorService;

#[derive(Clone)]
pub struct SelectorServer {
    service: SelectorService,
    tool_router: ToolRouter<SelectorServer>,
}

impl SelectorServer {
    pub fn new(service: SelectorService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

fn tool_error(err: AppError) -> String {
    err.public_message()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompareLaptopsParams {
    /// Laptop ids in display order; only the first three are used.
    ids: Vec<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct BrowseSoftwareResponse {
    programs: Vec<BrowsedSoftware>,
}

#[tool_router]
impl SelectorServer {
    #[tool(description = "List the usage categories (id, name, icon, examples) a recommendation can be weighted by.")]
    async fn list_categories(&self) -> Result<Json<CategoryListResponse>, String> {
        Ok(Json(self.service.categories()))
    }

    #[tool(description = "Rank laptops for a selection of usage categories (with optional percentage weights), specific program ids and price/SSD filters. Returns the aggregated requirement, per-laptop scores 0-100 with per-program verdicts, and a shareable query string.")]
    async fn recommend_laptops(
        &self,
        Parameters(request): Parameters<RecommendRequest>,
    ) -> Result<Json<RecommendResponse>, String> {
        if request.categories.is_empty() && request.program_ids.is_empty() {
            return Err("select at least one category or program".to_string());
        }
        let response = self.service.recommend(request).await.map_err(tool_error)?;
        Ok(Json(response))
    }

    #[tool(description = "Suggest CPU, GPU or RAM component names matching a partial query (type = cpu|gpu|ram, q at least 2 characters).")]
    async fn suggest_hardware(
        &self,
        Parameters(params): Parameters<SuggestParams>,
    ) -> Result<Json<SuggestResponse>, String> {
        let response = self.service.suggest(&params).await.map_err(tool_error)?;
        Ok(Json(response))
    }

    #[tool(description = "Find programs and games by name (case-insensitive substring, at least 2 characters) together with their minimum and recommended hardware.")]
    async fn search_programs(
        &self,
        Parameters(params): Parameters<ProgramSearchParams>,
    ) -> Result<Json<ProgramSearchResponse>, String> {
        let response = self
            .service
            .search_programs(&params)
            .await
            .map_err(tool_error)?;
        Ok(Json(response))
    }

    #[tool(description = "Get one laptop with its components, benchmark scores, price and links.")]
    async fn get_laptop(
        &self,
        Parameters(params): Parameters<LaptopIdParams>,
    ) -> Result<Json<LaptopRow>, String> {
        let laptop = self.service.laptop(params.id).await.map_err(tool_error)?;
        Ok(Json(laptop))
    }

    #[tool(description = "Fetch up to three laptops side by side, in the order given. Unknown ids are skipped.")]
    async fn compare_laptops(
        &self,
        Parameters(params): Parameters<CompareLaptopsParams>,
    ) -> Result<Json<LaptopListResponse>, String> {
        let ids: Vec<i64> = params.ids.into_iter().take(MAX_COMPARE).collect();
        let response = self.service.compare(&ids).await.map_err(tool_error)?;
        Ok(Json(response))
    }

    #[tool(description = "Browse reference software requirement sheets by name, OS, CPU, GPU, RAM, disk type and free/open-source tags. When a machine (ram_gb, cpu_cores) is given, each hit is marked compatible or not.")]
    async fn browse_software(
        &self,
        Parameters(request): Parameters<SoftwareBrowseRequest>,
    ) -> Result<Json<BrowseSoftwareResponse>, String> {
        Ok(Json(BrowseSoftwareResponse {
            programs: self.service.browse_software(&request),
        }))
    }
}

#[tool_handler]
impl ServerHandler for SelectorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "laptop-selector".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Laptop recommendation server. Call list_categories to see the usage categories, \
search_programs to resolve program ids, then recommend_laptops with categories, optional weights, \
program_ids and filters. Use get_laptop/compare_laptops for details and suggest_hardware for \
component name completion. browse_software checks reference requirement sheets against a machine."
                    .to_string(),
            ),
        }
    }
}
