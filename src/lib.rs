//! Manga catalog backend: cached catalog reads with CDN-agnostic asset paths.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
