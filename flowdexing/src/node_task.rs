/// Handle over the spawned indexing tasks (one worker per chain plus the
/// metadata backfill). The indexer stops when the handle is dropped or
/// `stop` is called, whichever comes first.
pub struct NodeTask {
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl NodeTask {
    pub fn new(tasks: Vec<tokio::task::JoinHandle<()>>) -> Self {
        NodeTask { tasks }
    }

    /// Aborts every task. In-flight commits are atomic, so stopping
    /// mid-cycle never leaves partial state behind.
    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for NodeTask {
    fn drop(&mut self) {
        self.stop();
    }
}
