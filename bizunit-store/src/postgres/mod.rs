mod migrate;
mod plans;
mod rdb;
mod store;

pub use migrate::run_migrations;
pub use rdb::PostgresRdb;
pub use store::PostgresPlanStore;
