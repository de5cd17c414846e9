use anyhow::Context;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::store::{DocumentStore, PgDocumentStore};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgDocumentStore::connect(&config::config().database)
        .await
        .context("failed to connect to the document store")?;
    let result = store.ping().await;
    store.close().await;
    result.context("document store ping failed")?;

    output_success(output_format, "Document store is reachable", None)
}
