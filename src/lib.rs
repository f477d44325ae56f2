//! # reward-engine — Reward-rule engine and RTP calculator
//!
//! Backs every slot mode of the portal (basic, advanced, supreme) with a
//! deterministic rule classifier and a probability/RTP calculator that
//! works without live play.
//!
//! ## Features
//!
//! - **Weighted Draws**: i.i.d. symbol sampling from admin-edited weights
//! - **Rule Classification**: prioritized pattern/count/symbol-set rules
//!   with punitive citation rules, strict or lenient positioning
//! - **Exact Probabilities**: full-enumeration RTP, exact to float precision
//! - **Monte Carlo Estimation**: rayon-sharded simulation for cached reports
//! - **Report Cache**: permanent entries, explicit invalidation on edits,
//!   startup warm-up, per-key stampede guard
//!
//! ## Architecture
//!
//! ```text
//! RewardEngine
//!     │
//!     ├── WeightTable (symbol → weight, citation marker)
//!     ├── RuleSet (prioritized rules + punishments)
//!     ├── Drawer (seedable weighted sampling)
//!     │     │
//!     │     v
//!     ├── classify → ClassificationResult
//!     │
//!     ├── compute_exact ──┐
//!     ├── compute_monte_carlo ─┴→ ProbabilityReport
//!     │
//!     └── ProbabilityCache (get / put / invalidate)
//! ```

pub mod cache;
pub mod classify;
pub mod drawer;
pub mod error;
pub mod probability;
pub mod rules;
pub mod service;
pub mod symbols;

pub use cache::*;
pub use classify::*;
pub use drawer::*;
pub use error::*;
pub use probability::*;
pub use rules::*;
pub use service::*;
pub use symbols::*;
