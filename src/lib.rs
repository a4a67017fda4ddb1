pub mod app;
pub mod collect;
pub mod commands;
pub mod config;
pub mod github;
pub mod hours;
pub mod invoice;
pub mod model;
pub mod session;
pub mod store;
