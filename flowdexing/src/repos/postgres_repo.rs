mod migrations;

use diesel::result::Error;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl,
};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::chain_states::{ChainState, UnsavedChainState};
use crate::events::WorkflowEvent;
use crate::processor::ProcessedBatch;
use crate::workflows::{execution_count, UnsavedRunMarker, UnsavedWorkflow, Workflow};

use super::repo::{CommitSummary, Repo, RepoError, RepoMigrations, SQLikeMigrations};

pub type PostgresRepoConn<'a> =
    bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type PostgresRepoPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone, Debug)]
pub struct PostgresRepo {
    url: String,
}

impl PostgresRepo {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    pub async fn migrate(&self) -> Result<(), RepoError> {
        self.execute_raw_queries(&Self::get_internal_migrations()).await
    }

    /// One-shot fresh-start wipe, to run before any worker starts.
    pub async fn reset(&self) -> Result<(), RepoError> {
        self.execute_raw_queries(SQLikeMigrations::wipe()).await
    }

    async fn execute_raw_queries(&self, queries: &[&str]) -> Result<(), RepoError> {
        let pool = self.get_pool(1).await;
        let mut conn = Self::get_conn(&pool).await;

        for query in queries {
            diesel::sql_query(*query)
                .execute(&mut conn)
                .await
                .map_err(|error| RepoError::Unknown(error.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    type Pool = PostgresRepoPool;
    type Conn<'a> = PostgresRepoConn<'a>;

    async fn get_pool(&self, max_size: u32) -> Self::Pool {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&self.url);

        bb8::Pool::builder().max_size(max_size).build(manager).await.unwrap()
    }

    async fn get_conn<'a>(pool: &'a Self::Pool) -> Self::Conn<'a> {
        pool.get().await.unwrap()
    }

    async fn create_chain_states<'a>(
        conn: &mut Self::Conn<'a>,
        chain_states: &[UnsavedChainState],
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::flowdexing_chain_states;

        diesel::insert_into(flowdexing_chain_states::table)
            .values(chain_states)
            .on_conflict(flowdexing_chain_states::chain_id)
            .do_nothing()
            .execute(conn)
            .await
            .map_err(|error| RepoError::Unknown(error.to_string()))?;

        Ok(())
    }

    async fn get_chain_state<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
    ) -> Result<Option<ChainState>, RepoError> {
        use crate::diesel::schema::flowdexing_chain_states;

        flowdexing_chain_states::table
            .find(chain_id)
            .first(conn)
            .await
            .optional()
            .map_err(|error| RepoError::Unknown(error.to_string()))
    }

    async fn update_sync_status<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        is_synced: bool,
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::flowdexing_chain_states;

        diesel::update(flowdexing_chain_states::table.find(chain_id))
            .set(flowdexing_chain_states::is_synced.eq(is_synced))
            .execute(conn)
            .await
            .map_err(|error| RepoError::Unknown(error.to_string()))?;

        Ok(())
    }

    async fn commit_batch<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        batch: &ProcessedBatch,
        last_processed_block: i64,
    ) -> Result<CommitSummary, RepoError> {
        use crate::diesel::schema::{
            flowdexing_chain_states, flowdexing_events, flowdexing_run_markers,
            flowdexing_workflows,
        };

        let events = batch.events.clone();
        let new_workflows: Vec<UnsavedWorkflow> =
            batch.new_workflows.iter().map(|hash| UnsavedWorkflow::new(hash)).collect();
        let run_markers: Vec<UnsavedRunMarker> = batch.runs.iter().map(Into::into).collect();
        let cancellations = batch.cancellations.clone();

        conn.transaction::<CommitSummary, Error, _>(|conn| {
            async move {
                // Replayed records bounce off the natural-identity index
                // instead of failing the whole commit.
                let mut inserted_events = 0;
                if !events.is_empty() {
                    inserted_events = diesel::insert_into(flowdexing_events::table)
                        .values(&events)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                }

                if !new_workflows.is_empty() {
                    diesel::insert_into(flowdexing_workflows::table)
                        .values(&new_workflows)
                        .on_conflict(flowdexing_workflows::ipfs_hash)
                        .do_nothing()
                        .execute(conn)
                        .await?;
                }

                // The unique (ipfs_hash, nonce) index arbitrates dedup: only a
                // marker this transaction actually inserts increments `runs`,
                // so concurrent workers observing the same pair cannot
                // double-count.
                let mut new_runs = 0;
                for marker in &run_markers {
                    let inserted = diesel::insert_into(flowdexing_run_markers::table)
                        .values(marker)
                        .on_conflict((
                            flowdexing_run_markers::ipfs_hash,
                            flowdexing_run_markers::nonce,
                        ))
                        .do_nothing()
                        .execute(conn)
                        .await?;

                    if inserted == 1 {
                        diesel::update(
                            flowdexing_workflows::table
                                .filter(flowdexing_workflows::ipfs_hash.eq(&marker.ipfs_hash)),
                        )
                        .set(flowdexing_workflows::runs.eq(flowdexing_workflows::runs + 1))
                        .execute(conn)
                        .await?;

                        // A workflow whose metadata declares an execution
                        // count retires once that many runs landed.
                        let (runs, meta): (i64, Option<serde_json::Value>) =
                            flowdexing_workflows::table
                                .find(&marker.ipfs_hash)
                                .select((
                                    flowdexing_workflows::runs,
                                    flowdexing_workflows::meta,
                                ))
                                .first(conn)
                                .await?;
                        if execution_count(meta.as_ref()).is_some_and(|count| runs >= count) {
                            diesel::update(
                                flowdexing_workflows::table.filter(
                                    flowdexing_workflows::ipfs_hash.eq(&marker.ipfs_hash),
                                ),
                            )
                            .set(flowdexing_workflows::is_cancelled.eq(true))
                            .execute(conn)
                            .await?;
                        }

                        new_runs += 1;
                    }
                }

                if !cancellations.is_empty() {
                    diesel::update(
                        flowdexing_workflows::table
                            .filter(flowdexing_workflows::ipfs_hash.eq_any(&cancellations)),
                    )
                    .set(flowdexing_workflows::is_cancelled.eq(true))
                    .execute(conn)
                    .await?;
                }

                diesel::update(flowdexing_chain_states::table.find(chain_id))
                    .set(flowdexing_chain_states::last_processed_block.eq(last_processed_block))
                    .execute(conn)
                    .await?;

                Ok(CommitSummary {
                    events: inserted_events,
                    new_runs,
                })
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| RepoError::Unknown(error.to_string()))
    }

    async fn get_due_backfills<'a>(
        conn: &mut Self::Conn<'a>,
        cutoff: i64,
        limit: i64,
    ) -> Result<Vec<Workflow>, RepoError> {
        use crate::diesel::schema::flowdexing_workflows;

        flowdexing_workflows::table
            .filter(flowdexing_workflows::has_meta.eq(false))
            .filter(
                flowdexing_workflows::last_meta_fetch_failure
                    .is_null()
                    .or(flowdexing_workflows::last_meta_fetch_failure.lt(cutoff)),
            )
            .order(flowdexing_workflows::ipfs_hash.asc())
            .limit(limit)
            .load(conn)
            .await
            .map_err(|error| RepoError::Unknown(error.to_string()))
    }

    async fn fill_meta<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        meta: &serde_json::Value,
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::flowdexing_workflows;

        diesel::update(
            flowdexing_workflows::table.filter(flowdexing_workflows::ipfs_hash.eq(ipfs_hash)),
        )
        .set((
            flowdexing_workflows::has_meta.eq(true),
            flowdexing_workflows::meta.eq(Some(meta.clone())),
            flowdexing_workflows::last_meta_fetch_failure.eq(None::<i64>),
        ))
        .execute(conn)
        .await
        .map_err(|error| RepoError::Unknown(error.to_string()))?;

        Ok(())
    }

    async fn record_meta_failure<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        failed_at: i64,
    ) -> Result<(), RepoError> {
        use crate::diesel::schema::flowdexing_workflows;

        diesel::update(
            flowdexing_workflows::table.filter(flowdexing_workflows::ipfs_hash.eq(ipfs_hash)),
        )
        .set(flowdexing_workflows::last_meta_fetch_failure.eq(Some(failed_at)))
        .execute(conn)
        .await
        .map_err(|error| RepoError::Unknown(error.to_string()))?;

        Ok(())
    }

    async fn get_all_events<'a>(
        conn: &mut Self::Conn<'a>,
    ) -> Result<Vec<WorkflowEvent>, RepoError> {
        use crate::diesel::schema::flowdexing_events;

        flowdexing_events::table
            .order((
                flowdexing_events::chain_id.asc(),
                flowdexing_events::block_number.asc(),
            ))
            .load(conn)
            .await
            .map_err(|error| RepoError::Unknown(error.to_string()))
    }

    async fn get_workflow<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
    ) -> Result<Option<Workflow>, RepoError> {
        use crate::diesel::schema::flowdexing_workflows;

        flowdexing_workflows::table
            .find(ipfs_hash)
            .first(conn)
            .await
            .optional()
            .map_err(|error| RepoError::Unknown(error.to_string()))
    }
}
