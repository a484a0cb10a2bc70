mod channel;
mod context;
mod report;
mod run;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::Context;
pub use report::{RunReport, RunStatus};
pub use run::{RunHandle, RunId, RunOptions};
