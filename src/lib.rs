pub mod actions;
pub mod app;
pub mod chart;
pub mod clipboard;
pub mod config;
pub mod domain;
pub mod earthengine;
pub mod error;
pub mod lister;
pub mod namespace;
pub mod natsort;
pub mod output;
pub mod tasks;
pub mod tree;
pub mod tui;
