#[cfg(test)]
mod tests {
    use flowdexing::{Chain, Config, ConfigError, PostgresRepo};

    use crate::factory::test_chain;

    fn new_config() -> Config {
        Config::new(PostgresRepo::new("postgres://localhost/flowdexing_tests"))
    }

    #[test]
    fn requires_at_least_one_chain() {
        let error = new_config().validate().unwrap_err();
        assert!(matches!(error, ConfigError::NoChains));
    }

    #[test]
    fn rejects_a_chain_configured_twice() {
        let config = new_config().add_chain(test_chain(1)).add_chain(test_chain(1));

        let error = config.validate().unwrap_err();
        assert!(matches!(error, ConfigError::DuplicateChain(1)));
    }

    #[test]
    fn rejects_an_invalid_registry_address() {
        let config = new_config()
            .add_chain(Chain::new(137, "https://rpc.example.com", "not-an-address"));

        let error = config.validate().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidRegistryAddress(137)));
    }

    #[test]
    fn rejects_an_invalid_json_rpc_url() {
        let config = new_config().add_chain(Chain::new(
            137,
            "rpc.example.com",
            "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
        ));

        let error = config.validate().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidRpcUrl(137)));
    }

    #[test]
    fn accepts_distinct_well_formed_chains() {
        let config = new_config().add_chain(test_chain(1)).add_chain(test_chain(137));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn carries_indexing_defaults() {
        let chain = Chain::new(
            1,
            "https://rpc.example.com",
            "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
        );
        assert_eq!(chain.batch_size, 50);
        assert_eq!(chain.block_delay, 2);
        assert_eq!(chain.poll_interval_ms, 10_000);
        assert_eq!(chain.sync_threshold, 100);

        let config = new_config();
        assert_eq!(config.metadata_endpoint, "https://ipfs.io/ipfs");
        assert_eq!(config.backfill_interval_ms, 60_000);
        assert_eq!(config.backfill_batch_size, 10);
        assert_eq!(config.meta_retry_cooldown_secs, 300);
        assert!(!config.fresh_start);
    }
}
