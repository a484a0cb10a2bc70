mod action;
mod models;

pub use action::{PivotAction, descriptor};
pub use models::AggFunc;
