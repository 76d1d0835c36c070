//! Task hierarchy and progress projection engine.
//!
//! `engine` is pure and stateless: every call takes a full task snapshot and
//! returns fresh derived output. `engine::store` is the only part that
//! touches the filesystem.

pub mod engine;
