#[cfg(test)]
mod tests {
    use flowdexing::{
        worker, Chain, CycleError, RegistryEvents, RegistryFilter, Repo, UnsavedChainState,
    };

    use crate::factory::{
        cancelled_log, created_log, run_log, run_receipt, test_chain, transaction_hash,
        FakeProvider, GENESIS_TIMESTAMP, OTHER_WORKFLOW_HASH, WORKFLOW_HASH,
    };
    use crate::memory_repo::MemoryRepo;

    async fn seeded_conn(repo: &MemoryRepo, chains: &[&Chain]) -> MemoryRepo {
        let pool = repo.get_pool(1).await;
        let mut conn = MemoryRepo::get_conn(&pool).await;

        let chain_states: Vec<UnsavedChainState> =
            chains.iter().map(|chain| UnsavedChainState::new(chain)).collect();
        MemoryRepo::create_chain_states(&mut conn, &chain_states).await.unwrap();

        conn
    }

    #[tokio::test]
    async fn scans_the_delayed_range_and_advances_the_scan_position() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);

        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();

        assert_eq!(outcome.head, 200);
        assert_eq!(outcome.range, Some((101, 151)));

        let state = MemoryRepo::get_chain_state(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(state.last_processed_block, 151);

        let filters = provider.requested_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].get_from_block(), Some(101.into()));
        assert_eq!(filters[0].get_to_block(), Some(151.into()));
    }

    #[tokio::test]
    async fn commits_events_together_with_the_scan_position() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.add_log(created_log(&registry, WORKFLOW_HASH, 120));

        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();
        assert_eq!(outcome.events, 1);

        let events = MemoryRepo::get_all_events(&mut conn).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "Created");
        assert_eq!(events[0].block_number, 120);
        assert_eq!(events[0].ipfs_hash, WORKFLOW_HASH);
        assert_eq!(events[0].timestamp, (GENESIS_TIMESTAMP + 120) as i64);

        let workflow =
            MemoryRepo::get_workflow(&mut conn, WORKFLOW_HASH).await.unwrap().unwrap();
        assert!(!workflow.is_cancelled);
        assert_eq!(workflow.runs, 0);
    }

    #[tokio::test]
    async fn a_failed_commit_leaves_no_partial_writes() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.add_log(created_log(&registry, WORKFLOW_HASH, 120));

        repo.fail_next_commit();
        let error =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap_err();
        assert!(matches!(error, CycleError::Commit(_)));

        assert!(MemoryRepo::get_all_events(&mut conn).await.unwrap().is_empty());
        let state = MemoryRepo::get_chain_state(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(state.last_processed_block, 100);

        // The next tick retries the same range and lands it.
        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();
        assert_eq!(outcome.range, Some((101, 151)));
        assert_eq!(MemoryRepo::get_all_events(&mut conn).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn a_head_fetch_failure_is_transient_and_leaves_state_untouched() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.fail_next_head();

        let error =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap_err();
        assert!(matches!(error, CycleError::TransientFetch(_)));

        let state = MemoryRepo::get_chain_state(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(state.last_processed_block, 100);
    }

    #[tokio::test]
    async fn does_nothing_when_already_at_the_delayed_target() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(102);

        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();

        assert_eq!(outcome.range, None);
        assert!(provider.requested_filters().is_empty());
        let state = MemoryRepo::get_chain_state(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(state.last_processed_block, 100);
    }

    #[tokio::test]
    async fn deduplicates_runs_across_chains_but_keeps_every_log_record() {
        let mainnet = test_chain(1);
        let polygon = test_chain(137);
        let registry = RegistryEvents::new();
        let mainnet_filter = RegistryFilter::new(&mainnet, &registry).unwrap();
        let polygon_filter = RegistryFilter::new(&polygon, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&mainnet, &polygon]).await;

        // The same logical execution observed on both chains.
        let mainnet_provider = FakeProvider::new(200);
        mainnet_provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 42, 110));
        let polygon_provider = FakeProvider::new(200);
        polygon_provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 42, 130));

        let first = worker::run_cycle::<MemoryRepo, _>(
            &mut conn,
            &mainnet_provider,
            &registry,
            &mainnet_filter,
            &mainnet,
        )
        .await
        .unwrap();
        let second = worker::run_cycle::<MemoryRepo, _>(
            &mut conn,
            &polygon_provider,
            &registry,
            &polygon_filter,
            &polygon,
        )
        .await
        .unwrap();

        assert_eq!(first.new_runs, 1);
        assert_eq!(second.new_runs, 0);

        let workflow =
            MemoryRepo::get_workflow(&mut conn, WORKFLOW_HASH).await.unwrap().unwrap();
        assert_eq!(workflow.runs, 1);

        let events = MemoryRepo::get_all_events(&mut conn).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.event == "Run"));
        assert!(events.iter().all(|event| event.nonce.as_deref() == Some("42")));
    }

    #[tokio::test]
    async fn counts_distinct_nonces_as_distinct_runs() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 42, 110));
        provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 43, 111));

        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();
        assert_eq!(outcome.new_runs, 2);

        let workflow =
            MemoryRepo::get_workflow(&mut conn, WORKFLOW_HASH).await.unwrap().unwrap();
        assert_eq!(workflow.runs, 2);
    }

    #[tokio::test]
    async fn cancelling_twice_is_idempotent() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 42, 110));
        provider.add_log(cancelled_log(&registry, WORKFLOW_HASH, 115));
        provider.add_log(cancelled_log(&registry, WORKFLOW_HASH, 120));

        worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
            .await
            .unwrap();

        let workflow =
            MemoryRepo::get_workflow(&mut conn, WORKFLOW_HASH).await.unwrap().unwrap();
        assert!(workflow.is_cancelled);
        assert_eq!(workflow.runs, 1);
        assert_eq!(MemoryRepo::get_all_events(&mut conn).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn attaches_the_transaction_receipt_to_run_events() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(200);
        provider.add_log(run_log(&registry, WORKFLOW_HASH, 7, 42, 110));
        provider.add_log(created_log(&registry, OTHER_WORKFLOW_HASH, 111));
        provider.add_receipt(
            transaction_hash(110),
            run_receipt("0x7dfd6013cf8d92b751e63d481b51fe0e4c5abf5e", 21_000, 30_000_000_000),
        );

        worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
            .await
            .unwrap();

        let events = MemoryRepo::get_all_events(&mut conn).await.unwrap();
        let run_event = events.iter().find(|event| event.event == "Run").unwrap();
        let receipt = run_event.receipt.as_ref().unwrap();
        assert_eq!(receipt["gas_used"], "21000");
        assert_eq!(receipt["gas_price"], "30000000000");
        assert_eq!(receipt["from"], "0x7dfd6013cf8d92b751e63d481b51fe0e4c5abf5e");

        let created_event = events.iter().find(|event| event.event == "Created").unwrap();
        assert!(created_event.receipt.is_none());
    }

    #[tokio::test]
    async fn reports_synced_only_below_the_lag_threshold() {
        let chain = test_chain(1).with_sync_threshold(5);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let mut conn = seeded_conn(&repo, &[&chain]).await;
        let provider = FakeProvider::new(156);

        // Commits up to 151, so the lag is exactly the threshold.
        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();
        assert_eq!(outcome.range, Some((101, 151)));
        assert!(!outcome.is_synced);

        provider.set_head(155);
        let outcome =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap();
        assert_eq!(outcome.range, Some((152, 153)));
        assert!(outcome.is_synced);
        assert!(outcome.sync_changed);

        let state = MemoryRepo::get_chain_state(&mut conn, 1).await.unwrap().unwrap();
        assert!(state.is_synced);
    }

    #[tokio::test]
    async fn fails_when_the_chain_was_never_seeded() {
        let chain = test_chain(1);
        let registry = RegistryEvents::new();
        let filter = RegistryFilter::new(&chain, &registry).unwrap();

        let repo = MemoryRepo::new();
        let pool = repo.get_pool(1).await;
        let mut conn = MemoryRepo::get_conn(&pool).await;
        let provider = FakeProvider::new(200);

        let error =
            worker::run_cycle::<MemoryRepo, _>(&mut conn, &provider, &registry, &filter, &chain)
                .await
                .unwrap_err();
        assert!(matches!(error, CycleError::Commit(_)));
    }
}
