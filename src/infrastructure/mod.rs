// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod configured_availability;
pub mod http_pusher;
pub mod ingest_provider;
