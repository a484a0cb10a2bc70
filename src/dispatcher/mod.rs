mod dispatcher;
mod plan;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use plan::ExecutionPlan;
