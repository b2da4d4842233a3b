mod postgres_repo;
mod repo;

pub use postgres_repo::{PostgresRepo, PostgresRepoConn, PostgresRepoPool};
pub use repo::{CommitSummary, Repo, RepoError, RepoMigrations, SQLikeMigrations};
