//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod calculator;
pub mod scraper;

pub use calculator::{CalculatorParams, CalculatorTool, Operation};
pub use scraper::{
    CheckTokopediaLoginParams, CheckTokopediaLoginTool, ScrapeTokopediaParams, ScrapeTokopediaTool,
    ScraperClient,
};
