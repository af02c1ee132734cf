//! Phonebook MCP Server - Main entry point
//!
//! This is the main executable for the Phonebook MCP Server, which provides a Model
//! Context Protocol (MCP) interface to a contact directory.

use anyhow::Result;
use phonebook_mcp_server::repositories::{
    ContactRepository, InMemoryContactRepository, SqliteContactRepository,
};
use phonebook_mcp_server::{
    Config, ContactService, ContactServiceImpl, PhonebookMcpServer, StorageBackend,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration before logging so LOG_LEVEL can seed the filter
    let config = Config::from_env();

    // Initialize logging (stderr only to avoid polluting stdout/MCP communication)
    let fallback = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match config {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize the contact store
    let repository: Arc<dyn ContactRepository> = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory contact store");
            Arc::new(InMemoryContactRepository::new())
        }
        StorageBackend::Sqlite => {
            info!("Opening SQLite contact store at {}", config.database_url);
            let repo =
                SqliteContactRepository::connect(&config.database_url, config.db_max_connections)
                    .await
                    .map_err(|e| {
                        error!("Failed to open database: {}", e);
                        e
                    })?;
            Arc::new(repo)
        }
    };

    let service = Arc::new(ContactServiceImpl::new(repository, config.service_config()))
        as Arc<dyn ContactService>;

    // Create the MCP server (tools are constructed internally)
    let server = PhonebookMcpServer::new(service);

    info!(
        "Phonebook MCP Server initialized (page size {}/{}, search limit {}/{}, timeout {}s)",
        config.default_page_size,
        config.max_page_size,
        config.default_search_limit,
        config.max_search_limit,
        config.operation_timeout_secs
    );

    // Run the server (this will block until the server exits)
    info!("Starting MCP server with stdio transport");
    phonebook_mcp_server::server::run_server(server).await?;

    info!("Phonebook MCP Server shutdown complete");
    Ok(())
}
