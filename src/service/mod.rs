//! Query planner, mutation dispatcher and record validation.

mod mutation;
mod planner;
mod validation;
pub use mutation::{MutationDispatcher, MutationOp};
pub use planner::QueryPlanner;
pub use validation::RequestValidator;
