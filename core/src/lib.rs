pub mod analytics;
pub mod export;
pub mod import;
pub mod models;
pub mod store;
pub mod suggest;
