pub mod backend_client;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod health_probe;
pub mod provider_mapper;
pub mod spotify_player_client;
