//! COVID-19 data explorer: loads the JHU CSSE global time series once, answers
//! region/date filter queries over it, and serves the results as JSON plus a
//! small browser console.

pub mod cli;
pub mod config;
pub mod data;
pub mod server;
