//! # Joint Trajectory Controller Panel
//!
//! Session core of an interactive monitor/control panel for one joint trajectory
//! controller at a time.
//!
//! ## Key Architecture
//! - **Discovery:** polls controller managers and their active trajectory controllers (1 Hz),
//!   primes a process-lifetime joint limit cache.
//! - **Session:** binds to the selected controller (state subscription, command publisher,
//!   network executor thread) and tears everything down before any rebind.
//! - **Mode:** monitor (feedback refreshes editors, 30 Hz) or control (commands published, 10 Hz).
//! - **Panel:** single-threaded UI loop driving all timers through `Panel::tick`.
//!
//! ## Concurrency
//! - The executor thread only decodes feedback and hands it to the UI loop over a bounded
//!   crossbeam channel; the runtime table is written on the UI loop alone.
//! - Unbinding joins the executor before returning.

pub mod config;
pub mod discovery;
pub mod error;
pub mod panel;
pub mod session;
pub mod sim;
pub mod utils;

pub use config::PanelConfig;
pub use error::{PanelError, PanelResult};
pub use panel::Panel;
pub use session::mode::Mode;
