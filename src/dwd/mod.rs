//! DWD pollen feed: data model, fetch, parse, cache and client facades.

pub mod blocking;
pub mod cache;
pub mod client;
pub mod disk;
pub mod fetch;
pub mod parse;
pub mod types;
