//! Skin health tracking: insight generation over analysis history, plus the
//! turn-taking and guided exercises of the wellbeing chat.

pub mod chat;
pub mod config;
pub mod db;
pub mod exercises;
pub mod insights;
pub mod logging;
pub mod meditation;
pub mod models;
pub mod report;
pub mod speech;
