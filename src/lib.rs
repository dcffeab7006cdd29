pub mod access;
pub mod app;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod keywords;
pub mod output;
pub mod relation;
pub mod report;
