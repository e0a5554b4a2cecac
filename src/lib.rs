//! Terminal client that keeps one Harvest timer in step with a Jira sprint board.

pub mod app;
pub mod board;
pub mod cli;
pub mod config;
pub mod dnd;
pub mod error;
pub mod event;
pub mod model;
pub mod notifications;
pub mod poll;
pub mod providers;
pub mod timer;
pub mod ui;
