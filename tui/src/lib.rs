//! twinchat TUI - Terminal surface for the chat pipeline
//!
//! A full-screen terminal UI over `twinchat-core`: it binds a conversation,
//! forwards what the user types, and renders the published snapshots with the
//! streaming reply revealed character by character.
//!
//! # Architecture
//!
//! - **App**: event loop, key handling, layout
//! - **Display**: pure view-to-lines rendering
//! - **Demo**: seeded in-process backend for `--demo`
//! - **Theme**: colors

pub mod app;
pub mod demo;
pub mod display;
pub mod theme;

pub use app::App;
