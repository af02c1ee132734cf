//! MCP tool handlers for the phonebook server.
//!
//! This module implements all the MCP tools using the rmcp SDK's tool_router pattern.

use crate::domain::{ContactId, Patch};
use crate::error::{ErrorKind, ServiceError};
use crate::models::{ContactCreateIn, ContactUpdateIn, ListFilter, PhoneIn};
use crate::services::ContactService;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// The phonebook MCP server that exposes the contact directory as tools.
#[derive(Clone)]
pub struct PhonebookMcpServer {
    contact_service: Arc<dyn ContactService>,
    tool_router: ToolRouter<Self>,
}

// Implement ServerHandler using the tool_handler macro
#[tool_handler]
impl ServerHandler for PhonebookMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "phonebook-mcp-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some("MCP server for a contact directory - create, update, delete, list and search contacts with normalized phone numbers.".into()),
        }
    }
}

// Helper structs for tool parameters
#[derive(Debug, Deserialize, JsonSchema)]
struct PhoneParam {
    #[serde(default)]
    label: Option<String>,
    phone_raw: String,
    #[serde(default)]
    is_primary: bool,
}

impl From<PhoneParam> for PhoneIn {
    fn from(param: PhoneParam) -> Self {
        PhoneIn {
            label: param.label,
            raw: param.phone_raw,
            is_primary: param.is_primary,
        }
    }
}

fn phones_in(params: Vec<PhoneParam>) -> Vec<PhoneIn> {
    params.into_iter().map(PhoneIn::from).collect()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateContactParams {
    first_name: String,
    last_name: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phones: Vec<PhoneParam>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ContactIdParams {
    id: i64,
}

/// Scalar fields: absent leaves the value, `null` clears it, a string
/// replaces it. `phones`: absent or `null` leaves them, `[]` removes all.
#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateContactParams {
    id: i64,
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    first_name: Patch<String>,
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    last_name: Patch<String>,
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    company: Patch<String>,
    #[serde(default)]
    phones: Option<Vec<PhoneParam>>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct ListContactsParams {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    after_id: Option<i64>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    order: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchContactsParams {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct GetMetricsParams {
    /// "json" (default) or "prometheus"
    #[serde(default)]
    format: Option<String>,
}

// Map a service failure onto the MCP error code for its kind
fn to_mcp_error(e: ServiceError) -> McpError {
    let code = match e.kind() {
        ErrorKind::Validation => ErrorCode::INVALID_PARAMS,
        ErrorKind::NotFound => ErrorCode::RESOURCE_NOT_FOUND,
        ErrorKind::Internal => ErrorCode::INTERNAL_ERROR,
    };
    McpError {
        code,
        message: Cow::from(e.message().to_string()),
        data: None,
    }
}

fn contact_id(raw: i64) -> Result<ContactId, McpError> {
    ContactId::new(raw).map_err(|e| to_mcp_error(e.into()))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        tracing::error!("Failed to serialize tool result: {}", e);
        to_mcp_error(ServiceError::internal())
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// Tool router implementation
#[tool_router]
impl PhonebookMcpServer {
    /// Create a new phonebook MCP server.
    pub fn new(contact_service: Arc<dyn ContactService>) -> Self {
        Self {
            contact_service,
            tool_router: Self::tool_router(),
        }
    }

    /// Create a contact with one or more phone numbers.
    #[tool(
        description = "Create a contact. Requires first_name, last_name and at least one phone; phones are normalized, duplicates dropped, and exactly one is marked primary (the first one if none is requested)."
    )]
    async fn create_contact(
        &self,
        params: Parameters<CreateContactParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let input = ContactCreateIn {
            first_name: params.first_name,
            last_name: params.last_name,
            company: params.company,
            phones: phones_in(params.phones),
        };

        let contact = self
            .contact_service
            .create_contact(input)
            .await
            .map_err(to_mcp_error)?;

        json_result(&contact)
    }

    /// Retrieve a contact by ID.
    #[tool(description = "Retrieve a contact and all its phones by ID")]
    async fn get_contact(
        &self,
        params: Parameters<ContactIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = contact_id(params.0.id)?;

        let contact = self
            .contact_service
            .get_contact(id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&contact)
    }

    /// Partially update a contact.
    #[tool(
        description = "Update a contact. Omitted fields are left unchanged; company may be set to null to remove it. Passing phones replaces the whole phone set, and an empty list removes all phones."
    )]
    async fn update_contact(
        &self,
        params: Parameters<UpdateContactParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let id = contact_id(params.id)?;

        let input = ContactUpdateIn {
            first_name: params.first_name,
            last_name: params.last_name,
            company: params.company,
            phones: params.phones.map(phones_in).into(),
        };

        let contact = self
            .contact_service
            .update_contact(id, input)
            .await
            .map_err(to_mcp_error)?;

        json_result(&contact)
    }

    /// Delete a contact and its phones.
    #[tool(description = "Permanently delete a contact and all its phones")]
    async fn delete_contact(
        &self,
        params: Parameters<ContactIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = contact_id(params.0.id)?;

        self.contact_service
            .delete_contact(id)
            .await
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({ "deleted": id }))
    }

    /// List contacts page by page.
    #[tool(
        description = "List contacts with optional case-insensitive filters on first_name, last_name, company and phone digits. Sort by name, created_at or updated_at (asc/desc). Pass page.next_after_id as after_id to fetch the next page."
    )]
    async fn list_contacts(
        &self,
        params: Parameters<ListContactsParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let after_id = params.after_id.map(contact_id).transpose()?;
        let filter = ListFilter {
            first_name: params.first_name,
            last_name: params.last_name,
            company: params.company,
            phone: params.phone,
            after_id,
            limit: params.limit,
            sort: params.sort,
            order: params.order,
        };

        let page = self
            .contact_service
            .list_contacts(filter)
            .await
            .map_err(to_mcp_error)?;

        json_result(&page)
    }

    /// Search contacts by phone digits or by name.
    #[tool(
        description = "Search contacts. A query of digits with an optional leading + is a phone lookup and returns only the matching phones; anything else is a name search ranked by similarity."
    )]
    async fn search_contacts(
        &self,
        params: Parameters<SearchContactsParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let contacts = self
            .contact_service
            .search(&params.query, params.limit)
            .await
            .map_err(to_mcp_error)?;

        json_result(&serde_json::json!({
            "query": params.query.trim(),
            "result_count": contacts.len(),
            "results": contacts,
        }))
    }

    /// Report per-operation service metrics.
    #[tool(
        description = "Get per-operation metrics: call counts, failures by kind (validation, not_found, internal) and total/average duration in milliseconds. format may be \"json\" (default) or \"prometheus\"."
    )]
    async fn get_metrics(
        &self,
        params: Parameters<GetMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        let summary = self.contact_service.metrics();

        match params.0.format.as_deref().map(str::trim) {
            None | Some("") | Some("json") => json_result(&summary),
            Some("prometheus") => Ok(CallToolResult::success(vec![Content::text(
                summary.to_prometheus(),
            )])),
            Some(other) => Err(to_mcp_error(ServiceError::Validation(format!(
                "unknown metrics format: {}",
                other
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::repositories::InMemoryContactRepository;
    use crate::services::ContactServiceImpl;

    fn server() -> PhonebookMcpServer {
        let repo = Arc::new(InMemoryContactRepository::new());
        let service = Arc::new(ContactServiceImpl::new(repo, ServiceConfig::default()));
        PhonebookMcpServer::new(service)
    }

    fn text_of(result: &CallToolResult) -> serde_json::Value {
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_error_codes_follow_kind() {
        assert_eq!(
            to_mcp_error(ServiceError::Validation("bad".into())).code,
            ErrorCode::INVALID_PARAMS
        );
        assert_eq!(
            to_mcp_error(ServiceError::NotFound("gone".into())).code,
            ErrorCode::RESOURCE_NOT_FOUND
        );
        let internal = to_mcp_error(ServiceError::internal());
        assert_eq!(internal.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(internal.message, "internal error");
    }

    #[test]
    fn test_update_params_distinguish_absent_and_null() {
        let params: UpdateContactParams =
            serde_json::from_value(serde_json::json!({ "id": 1, "company": null })).unwrap();
        assert_eq!(params.company, Patch::Clear);
        assert_eq!(params.first_name, Patch::Unset);
        assert!(params.phones.is_none());

        let params: UpdateContactParams =
            serde_json::from_value(serde_json::json!({ "id": 1, "phones": [] })).unwrap();
        assert_eq!(params.phones.map(|p| p.len()), Some(0));
    }

    #[test]
    fn test_non_positive_id_is_invalid_params() {
        let err = contact_id(0).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let server = server();
        let created = server
            .create_contact(Parameters(CreateContactParams {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                company: None,
                phones: vec![PhoneParam {
                    label: Some("home".to_string()),
                    phone_raw: "+44 20 7123 4567".to_string(),
                    is_primary: false,
                }],
            }))
            .await
            .unwrap();
        let created = text_of(&created);
        assert_eq!(created["phones"][0]["is_primary"], true);

        let fetched = server
            .get_contact(Parameters(ContactIdParams {
                id: created["id"].as_i64().unwrap(),
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&fetched)["last_name"], "Lovelace");
    }

    #[tokio::test]
    async fn test_delete_missing_is_resource_not_found() {
        let err = server()
            .delete_contact(Parameters(ContactIdParams { id: 404 }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_metrics_reports_tool_calls() {
        let server = server();
        server
            .get_contact(Parameters(ContactIdParams { id: 5 }))
            .await
            .unwrap_err();
        server
            .search_contacts(Parameters(SearchContactsParams {
                query: "ann".to_string(),
                limit: None,
            }))
            .await
            .unwrap();

        let result = server
            .get_metrics(Parameters(GetMetricsParams::default()))
            .await
            .unwrap();
        let json = text_of(&result);
        let operations = json["operations"].as_array().unwrap();
        let get = operations
            .iter()
            .find(|o| o["operation"] == "get_contact")
            .unwrap();
        assert_eq!(get["calls"], 1);
        assert_eq!(get["not_found_errors"], 1);
        let search = operations
            .iter()
            .find(|o| o["operation"] == "search")
            .unwrap();
        assert_eq!(search["calls"], 1);
        assert_eq!(search["internal_errors"], 0);

        let result = server
            .get_metrics(Parameters(GetMetricsParams {
                format: Some("prometheus".to_string()),
            }))
            .await
            .unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        assert!(text.contains("phonebook_operation_calls_total{operation=\"search\"} 1"));

        let err = server
            .get_metrics(Parameters(GetMetricsParams {
                format: Some("xml".to_string()),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
