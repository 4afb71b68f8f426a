//! Goal simplification
//!
//! A resolved grid is turned into final history in two phases, following
//! the functional core / imperative shell split:
//!
//! 1. **Planning** ([`plan`]) - pure: picks which cells become commits and how
//!    they are parented, based on the requested [`Goal`](crate::types::Goal)
//! 2. **Execution** ([`execute`]) - effectful: writes the commits through the
//!    backend and moves the target branch

pub mod execute;
pub mod plan;

pub use execute::execute_plan;
pub use plan::{CommitMessage, GoalPlan, ParentRef, PlanStep, border_path, create_goal_plan};
