#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// every predecessor reached a terminal state
    Ready,
    Running(i64),
    Succeeded(i64),
    Failed(String),
    Skipped(String),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Ready => "Ready",
            NodeEvent::Running(_) => "Running",
            NodeEvent::Succeeded(_) => "Succeeded",
            NodeEvent::Failed(_) => "Failed",
            NodeEvent::Skipped(_) => "Skipped",
        }
    }
}
