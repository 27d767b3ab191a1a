pub mod agent;
pub mod config;
pub mod extractor;
pub mod humanize;
pub mod ledger;
pub mod notify;
pub mod observability;
pub mod patterns;
pub mod proxy;
pub mod scanner;
pub mod scheduler;
