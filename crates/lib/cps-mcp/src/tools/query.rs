use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{CpsMcp, helpers};

/// Parameters for querying the school/neighborhood table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QuerySchoolsParams {
    /// SELECT SQL query to execute.
    pub query: String,
}

/// Parameters for retrieving school-website context.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryWebsitesParams {
    /// Question to answer using relevant context from the school websites.
    pub question: String,
    /// Optional filter to only search within a specific school's website.
    pub school_name: Option<String>,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl CpsMcp {
    #[tool(
        description = "Execute a single read-only SELECT query on the `schooltoneighborhood` table of Chicago public schools and their neighborhoods. Returns matching rows as JSON objects."
    )]
    async fn query_schools_and_neighborhoods(
        &self,
        Parameters(params): Parameters<QuerySchoolsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.query.trim().is_empty() {
            return Err(helpers::invalid_params("query must not be empty"));
        }
        let control = self.control().await?;
        let rows = control
            .query_schools(&params.query)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(rows)?]))
    }

    #[tool(
        description = "Query a database of Chicago public school websites for context relevant to answering a given question. Returns assembled passages, best match first."
    )]
    async fn query_school_websites(
        &self,
        Parameters(params): Parameters<QueryWebsitesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.question.trim().is_empty() {
            return Err(helpers::invalid_params("question must not be empty"));
        }
        let control = self.control().await?;
        let context = control
            .retrieve_context(&params.question, params.school_name.as_deref())
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::text(context)]))
    }
}
