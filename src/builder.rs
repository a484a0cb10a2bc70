use std::{sync::Arc, time::Duration};

use tokio::runtime::{Builder, Runtime};

use crate::{Config, Engine, ExecutionMode, Result, TabflowError, workflow::NodeRegistry};

pub struct EngineBuilder {
    async_worker_thread_number: u16,
    rt: Option<Arc<Runtime>>,
    registry: Option<NodeRegistry>,
    mode: ExecutionMode,
    node_timeout: Option<Duration>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            async_worker_thread_number: config.async_worker_thread_number,
            rt: None,
            registry: None,
            mode: config.execution.mode,
            node_timeout: config.execution.node_timeout(),
        }
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.async_worker_thread_number = n;
        self
    }

    /// Run on an existing runtime instead of building one.
    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    /// Replace the built-in node types.
    pub fn registry(
        mut self,
        registry: NodeRegistry,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(
        mut self,
        mode: ExecutionMode,
    ) -> Self {
        self.mode = mode;
        self
    }

    pub fn node_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        let runtime = match &self.rt {
            Some(rt) => rt.clone(),
            None => Arc::new(
                Builder::new_multi_thread()
                    .worker_threads(self.async_worker_thread_number.max(1).into())
                    .enable_all()
                    .build()
                    .map_err(|e| TabflowError::Engine(format!("failed to build runtime: {}", e)))?,
            ),
        };
        let registry = Arc::new(self.registry.clone().unwrap_or_else(NodeRegistry::builtin));
        let engine = Engine::new(runtime, registry, self.mode, self.node_timeout);

        Ok(engine)
    }
}
