//! Fleetgradectl library - exposes modules for testing

pub mod cli;
pub mod commands;
pub mod display;
pub mod errors;
pub mod logging;
