// src/ingest/providers/mod.rs
pub mod html;
pub mod rss;
pub mod search;
