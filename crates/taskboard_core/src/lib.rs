pub mod app;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod poller;
pub mod repo;
pub mod storage;
