//! Core engine modules for the board.

pub mod dates;
pub mod edit;
pub mod error;
pub mod graph;
pub mod progress;
pub mod state;
pub mod store;
pub mod types;
pub mod view;
