use super::PostgresRepo;
use crate::repos::repo::{RepoMigrations, SQLikeMigrations};

impl RepoMigrations for PostgresRepo {
    fn create_chain_states_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_chain_states()
    }

    fn create_events_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_events()
    }

    fn create_workflows_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_workflows()
    }

    fn create_run_markers_migration() -> &'static [&'static str] {
        SQLikeMigrations::create_run_markers()
    }
}
