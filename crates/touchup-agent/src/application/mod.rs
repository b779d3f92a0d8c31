//! Application layer use cases for the agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the domain rules in `touchup_core`
//! (pure decisions about displays, hot-plug evidence and calibration) and the
//! infrastructure (OS display APIs, the touch driver, config files, tokio).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects in response to platform events.
//! - **Depend on abstractions** (`DisplayEnumerator`, `TouchDriver`) so the
//!   platform can be replaced by a mock in tests.
//! - **Contain no OS calls, no file system access, no async runtime**.
//!
//! # Sub-modules
//!
//! - **`display_registry`** – Holds the latest display enumeration and
//!   reports which displays were added or removed by a refresh.
//!
//! - **`coordinator`** – The single owner of all touchscreen state: the
//!   remembered identity, hot-plug evidence, connection state, current
//!   selection and the active calibration session.

pub mod coordinator;
pub mod display_registry;
