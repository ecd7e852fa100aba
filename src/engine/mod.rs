//! Execution engine for converge
//!
//! The engine orchestrates:
//! 1. Planning - Resolve configuration and recorded state into changes
//! 2. Diffing - Show what each change does to each attribute
//! 3. Executing - Reconcile changes with parallelism and a progress bar

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::display_diff;
pub use executor::{BarProgress, PromptConfirm, print_problems, print_summary};
pub use planner::{build_destroy_plan, build_plan, refresh_state};
