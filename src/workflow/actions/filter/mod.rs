mod action;
mod models;

pub use action::{FilterAction, descriptor};
pub use models::FilterOperator;
