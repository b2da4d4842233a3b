#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ethers::types::{Bytes, H256, U64};
    use flowdexing::{processor, ParseError, RegistryEvents};

    use crate::factory::{
        cancelled_log, created_log, run_log, OTHER_WORKFLOW_HASH, WORKFLOW_HASH,
    };

    fn timestamps(block_numbers: &[u64]) -> HashMap<U64, i64> {
        block_numbers
            .iter()
            .map(|block_number| ((*block_number).into(), 1_700_000_000 + *block_number as i64))
            .collect()
    }

    #[test]
    fn resolves_each_log_into_a_record_and_its_workflow_delta() {
        let registry = RegistryEvents::new();
        let logs = vec![
            created_log(&registry, WORKFLOW_HASH, 110),
            run_log(&registry, WORKFLOW_HASH, 7, 42, 111),
            cancelled_log(&registry, OTHER_WORKFLOW_HASH, 112),
        ];

        let batch =
            processor::process(&logs, &registry, 1, &timestamps(&[110, 111, 112]), &HashMap::new())
                .unwrap();

        assert_eq!(batch.events.len(), 3);
        assert_eq!(batch.new_workflows, vec![WORKFLOW_HASH, OTHER_WORKFLOW_HASH]);
        assert_eq!(batch.runs.len(), 1);
        assert_eq!(batch.runs[0].ipfs_hash, WORKFLOW_HASH);
        assert_eq!(batch.runs[0].nonce, "42");
        assert_eq!(batch.cancellations, vec![OTHER_WORKFLOW_HASH]);

        let run_event = &batch.events[1];
        assert_eq!(run_event.event, "Run");
        assert_eq!(run_event.chain_id, 1);
        assert_eq!(run_event.job_id.as_deref(), Some("7"));
        assert_eq!(run_event.nonce.as_deref(), Some("42"));
        assert_eq!(run_event.timestamp, 1_700_000_000 + 111);
    }

    #[test]
    fn skips_removed_logs_and_foreign_topics() {
        let registry = RegistryEvents::new();
        let mut removed = created_log(&registry, WORKFLOW_HASH, 110);
        removed.removed = Some(true);
        let mut foreign = created_log(&registry, WORKFLOW_HASH, 111);
        foreign.topics[0] = H256::zero();

        let batch = processor::process(
            &[removed, foreign],
            &registry,
            1,
            &timestamps(&[110, 111]),
            &HashMap::new(),
        )
        .unwrap();

        assert!(batch.is_empty());
        assert!(batch.new_workflows.is_empty());
    }

    #[test]
    fn deduplicates_runs_within_the_batch_but_keeps_every_record() {
        let registry = RegistryEvents::new();
        let logs = vec![
            run_log(&registry, WORKFLOW_HASH, 7, 42, 110),
            run_log(&registry, WORKFLOW_HASH, 7, 42, 111),
        ];

        let batch =
            processor::process(&logs, &registry, 1, &timestamps(&[110, 111]), &HashMap::new())
                .unwrap();

        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.runs.len(), 1);
        assert_eq!(batch.new_workflows.len(), 1);
    }

    #[test]
    fn fails_on_a_log_with_undecodable_data() {
        let registry = RegistryEvents::new();
        let mut log = run_log(&registry, WORKFLOW_HASH, 7, 42, 110);
        log.data = Bytes::default();

        let error =
            processor::process(&[log], &registry, 1, &timestamps(&[110]), &HashMap::new())
                .unwrap_err();
        assert!(matches!(error, ParseError::MalformedLog(_)));
    }

    #[test]
    fn fails_when_a_block_timestamp_is_missing() {
        let registry = RegistryEvents::new();
        let log = created_log(&registry, WORKFLOW_HASH, 110);

        let error = processor::process(&[log], &registry, 1, &HashMap::new(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(error, ParseError::MissingBlockTimestamp(110)));
    }
}
