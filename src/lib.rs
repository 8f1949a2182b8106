//! Conflict forecast index and terminal dashboard.
//!
//! [`forecast`] loads the pre-built forecast dataset into an in-memory
//! index keyed by country and period. The remaining modules render that
//! index as a braille choropleth map with per-country detail screens.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod forecast;
pub mod map;
pub mod route;
pub mod ui;
