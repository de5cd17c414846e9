use std::sync::Arc;

use anyhow::Context;

use crate::bootstrap::Backfill;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::store::PgDocumentStore;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let store = PgDocumentStore::connect(&config.database)
        .await
        .context("failed to connect to the document store")?;
    let store = Arc::new(store);

    let outcome = Backfill::from_config(store.clone(), config).run().await;
    store.close().await;
    let outcome = outcome.context("tenant backfill failed")?;

    output_success(output_format, &format!("Backfill: {}", outcome), Some(serde_json::to_value(&outcome)?))
}
