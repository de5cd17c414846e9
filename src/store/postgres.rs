use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};

use super::{Collection, DocumentSession, DocumentStore, ReplaceResult, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::{Filter, FilterData, JsonbQuery};
use crate::models::Document;

/// Document store over Postgres: one `(_rowid, doc JSONB)` table per collection
pub struct PgDocumentStore {
    pool: PgPool,
    operation_timeout: Duration,
    log_queries: bool,
}

impl PgDocumentStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout())
            .connect(url)
            .await?;
        info!("Created document store pool (max {} connections)", config.max_connections);

        let store = Self::from_pool(pool, config);
        store.ensure_collections().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            operation_timeout: config.operation_timeout(),
            log_queries: config.enable_query_logging,
        }
    }

    /// Create missing collection tables and their tenant index
    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            for statement in collection_ddl(collection) {
                sqlx::query(&statement).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed document store pool");
    }
}

fn collection_ddl(collection: Collection) -> [String; 2] {
    let name = collection.name();
    [
        format!("CREATE TABLE IF NOT EXISTS \"{}\" (_rowid BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL)", name),
        format!(
            "CREATE INDEX IF NOT EXISTS \"{n}_tenant_idx\" ON \"{n}\" ((doc->'org_id'), (doc->'app_id'))",
            n = name
        ),
    ]
}

async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::find(&mut conn, collection, query, self.log_queries).await
        })
        .await
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::insert_one(&mut conn, collection, doc, self.log_queries).await
        })
        .await
    }

    async fn replace_one(&self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::replace_one(&mut conn, collection, filter, doc, upsert, self.log_queries).await
        })
        .await
    }

    async fn update_many(&self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::update_many(&mut conn, collection, filter, set, self.log_queries).await
        })
        .await
    }

    async fn delete_many(&self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::delete_many(&mut conn, collection, filter, self.log_queries).await
        })
        .await
    }

    async fn distinct(&self, collection: Collection, field: &str, filter: Value) -> Result<Vec<Value>, StoreError> {
        timed(self.operation_timeout, async {
            let mut conn = self.pool.acquire().await?;
            ops::distinct(&mut conn, collection, field, filter, self.log_queries).await
        })
        .await
    }

    async fn begin(&self) -> Result<Box<dyn DocumentSession>, StoreError> {
        let tx = timed(self.operation_timeout, async { Ok(self.pool.begin().await?) }).await?;
        Ok(Box::new(PgSession {
            tx,
            operation_timeout: self.operation_timeout,
            log_queries: self.log_queries,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        timed(self.operation_timeout, async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}

/// Dropping the session without commit rolls the transaction back
struct PgSession {
    tx: Transaction<'static, Postgres>,
    operation_timeout: Duration,
    log_queries: bool,
}

#[async_trait]
impl DocumentSession for PgSession {
    async fn find(&mut self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError> {
        timed(self.operation_timeout, ops::find(&mut self.tx, collection, query, self.log_queries)).await
    }

    async fn insert_one(&mut self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        timed(self.operation_timeout, ops::insert_one(&mut self.tx, collection, doc, self.log_queries)).await
    }

    async fn replace_one(&mut self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError> {
        timed(self.operation_timeout, ops::replace_one(&mut self.tx, collection, filter, doc, upsert, self.log_queries)).await
    }

    async fn update_many(&mut self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        timed(self.operation_timeout, ops::update_many(&mut self.tx, collection, filter, set, self.log_queries)).await
    }

    async fn delete_many(&mut self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        timed(self.operation_timeout, ops::delete_many(&mut self.tx, collection, filter, self.log_queries)).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Statement execution shared by pooled connections and transactions
mod ops {
    use super::*;

    fn bind(sql: &JsonbQuery) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            // Every parameter is compared against a jsonb path
            q = q.bind(p.clone());
        }
        q
    }

    fn log(enabled: bool, sql: &JsonbQuery) {
        if enabled {
            debug!(query = %sql.query, params = sql.params.len(), "document store query");
        }
    }

    fn filter_for(collection: Collection, filter: Value) -> Result<Filter, StoreError> {
        let mut f = Filter::new(collection.name())?;
        f.where_clause(filter)?;
        Ok(f)
    }

    fn row_document(collection: Collection, row: PgRow) -> Result<Document, StoreError> {
        match row.try_get::<Value, _>("doc")? {
            Value::Object(doc) => Ok(doc),
            _ => Err(StoreError::InvalidDocument(collection)),
        }
    }

    pub async fn find(conn: &mut PgConnection, collection: Collection, query: FilterData, log_queries: bool) -> Result<Vec<Document>, StoreError> {
        let mut filter = Filter::new(collection.name())?;
        filter.assign(query)?;
        let sql = filter.to_select_sql()?;
        log(log_queries, &sql);
        let rows = bind(&sql).fetch_all(&mut *conn).await?;
        rows.into_iter().map(|row| row_document(collection, row)).collect()
    }

    pub async fn insert_one(conn: &mut PgConnection, collection: Collection, doc: Document, log_queries: bool) -> Result<(), StoreError> {
        let sql = Filter::new(collection.name())?.to_insert_sql(doc);
        log(log_queries, &sql);
        bind(&sql).execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn replace_one(
        conn: &mut PgConnection,
        collection: Collection,
        filter: Value,
        doc: Document,
        upsert: bool,
        log_queries: bool,
    ) -> Result<ReplaceResult, StoreError> {
        let f = filter_for(collection, filter)?;
        let sql = f.to_replace_sql(doc.clone())?;
        log(log_queries, &sql);
        let matched = bind(&sql).execute(&mut *conn).await?.rows_affected();
        if matched == 0 && upsert {
            insert_one(conn, collection, doc, log_queries).await?;
            return Ok(ReplaceResult { matched: 0, upserted: true });
        }
        Ok(ReplaceResult { matched, upserted: false })
    }

    pub async fn update_many(conn: &mut PgConnection, collection: Collection, filter: Value, set: Document, log_queries: bool) -> Result<u64, StoreError> {
        let sql = filter_for(collection, filter)?.to_update_sql(set)?;
        log(log_queries, &sql);
        Ok(bind(&sql).execute(&mut *conn).await?.rows_affected())
    }

    pub async fn delete_many(conn: &mut PgConnection, collection: Collection, filter: Value, log_queries: bool) -> Result<u64, StoreError> {
        let sql = filter_for(collection, filter)?.to_delete_sql()?;
        log(log_queries, &sql);
        Ok(bind(&sql).execute(&mut *conn).await?.rows_affected())
    }

    pub async fn distinct(conn: &mut PgConnection, collection: Collection, field: &str, filter: Value, log_queries: bool) -> Result<Vec<Value>, StoreError> {
        let sql = filter_for(collection, filter)?.to_distinct_sql(field)?;
        log(log_queries, &sql);
        let rows = bind(&sql).fetch_all(&mut *conn).await?;
        rows.into_iter()
            .map(|row| row.try_get::<Value, _>("value").map_err(StoreError::from))
            .collect()
    }
}
