pub mod asset;
pub mod fetcher;
pub mod manager;
pub mod manifest;
pub mod sprite;
