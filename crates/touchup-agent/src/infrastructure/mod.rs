//! Infrastructure layer for the agent.
//!
//! Contains the adapters around the pure coordinator: the Tokio runtime that
//! owns it, TOML persistence, the platform seams, and the shell bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `touchup_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`platform`** – implementations of `DisplayEnumerator` and
//!   `TouchDriver`.  Only the in-memory `MockPlatform` is provided; it backs
//!   the demo binary and the tests.
//!
//! - **`runtime`** – spawns the coordinator as a single-owner task, turns its
//!   effects into timers, persistence writes and broadcasts, and publishes a
//!   status snapshot after every event.
//!
//! - **`storage`** – TOML config file (settings plus the identity cue) and
//!   the `IdentityStore` seam used to persist the cue.
//!
//! - **`ui_bridge`** – DTOs and command functions for the menu bar shell.

pub mod platform;
pub mod runtime;
pub mod storage;
pub mod ui_bridge;
