//! Request structures shared by the server-side parser and the client builder.

pub mod mutation;
pub mod query;

pub use mutation::{Action, MutationRequest};
pub use query::{Direction, OrderSpec, Projection, QueryRequest};
