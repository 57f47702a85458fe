//! Vessel page crawler: scrapes vessel detail pages into a vessel registry
//! and a position log.

pub mod config;
pub mod crawler;
pub mod database;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod output;
pub mod page;
