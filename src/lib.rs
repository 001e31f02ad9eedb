//! ODAVL — self-driving code quality.
//!
//! The crate is two subsystems sharing one workspace layout:
//!
//! - [`autopilot`] — the observe → decide → act → verify → learn cycle over
//!   a static-analysis report, a directory of fix recipes, and a trust
//!   ledger.
//! - [`guardian`] — website checks (accessibility, performance, security)
//!   with scored JSON/HTML reports.
//!
//! Everything state-shaped lives under `.odavl/` and `reports/`; see
//! [`workspace::Workspace`].

pub mod autopilot;
pub mod cli;
pub mod error;
pub mod gates;
pub mod guardian;
pub mod insight;
pub mod recipes;
pub mod trust;
pub mod undo;
pub mod workspace;
