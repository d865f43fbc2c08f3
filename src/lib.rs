// Library for tests to access modules

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod metrics_client;
pub mod models;
pub mod refresh_worker;
pub mod routes;
pub mod tps_repo;
pub mod updater;
pub mod validator;
pub mod version;
