use std::collections::HashMap;
use std::sync::Arc;

/// A named task: resolves to a handler function taking serializable
/// (primitive-only) arguments.
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, payload: serde_json::Value) -> Result<(), anyhow::Error>;
}

#[derive(Default, Clone)]
pub struct TaskRegistry {
    tasks: HashMap<&'static str, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.name(), task);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }
}
