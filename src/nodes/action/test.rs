use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeResult},
    scripting::{Script, ScriptError},
    timer_queue::TimerQueue,
};

/// Configuration of a [`TestNode`], typically attached through a
/// substitution rule.
#[derive(Clone)]
pub struct TestNodeConfig {
    /// Status to return when the action completes.
    pub return_status: NodeStatus,
    /// Script to execute on a `Success` completion.
    pub success_script: Option<String>,
    /// Script to execute on a `Failure` completion.
    pub failure_script: Option<String>,
    /// Script to execute on any completion (unless halted).
    pub post_script: Option<String>,
    /// When non-zero the action becomes asynchronous and completes after
    /// this delay.
    pub async_delay: Duration,
    /// Invoked when the action completes; defaults to returning
    /// `return_status`. Override for more elaborate stubs.
    pub complete_fn: Option<Arc<dyn Fn() -> NodeStatus + Send + Sync>>,
}

impl Default for TestNodeConfig {
    fn default() -> Self {
        Self {
            return_status: NodeStatus::Success,
            success_script: None,
            failure_script: None,
            post_script: None,
            async_delay: Duration::ZERO,
            complete_fn: None,
        }
    }
}

/// Configurable stub action used by substitution rules: returns a chosen
/// status, optionally after an asynchronous delay, with optional
/// success/failure/post scripts.
pub struct TestNode {
    config: TestNodeConfig,
    success_executor: Option<Script>,
    failure_executor: Option<Script>,
    post_executor: Option<Script>,
    timer: Option<TimerQueue>,
    timer_id: Option<u64>,
    completed: Arc<AtomicBool>,
}

impl TestNode {
    /// Compiles the attached scripts; a malformed script fails here rather
    /// than at tick time.
    pub fn new(config: TestNodeConfig) -> Result<TestNode, ScriptError> {
        let compile = |source: &Option<String>| -> Result<Option<Script>, ScriptError> {
            source.as_ref().map(Script::parse).transpose()
        };

        Ok(Self {
            success_executor: compile(&config.success_script)?,
            failure_executor: compile(&config.failure_script)?,
            post_executor: compile(&config.post_script)?,
            config,
            timer: None,
            timer_id: None,
            completed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn on_completed(&self, node: &mut NodeData) -> NodeResult {
        let status = match &self.config.complete_fn {
            Some(complete) => complete(),
            None => self.config.return_status,
        };

        let mut env = node.config.script_env();
        if status == NodeStatus::Success {
            if let Some(script) = &self.success_executor {
                script.run(&mut env)?;
            }
        } else if status == NodeStatus::Failure {
            if let Some(script) = &self.failure_executor {
                script.run(&mut env)?;
            }
        }
        if let Some(script) = &self.post_executor {
            script.run(&mut env)?;
        }

        Ok(status)
    }
}

impl NodeBehavior for TestNode {
    fn start<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            if self.config.async_delay.is_zero() {
                return self.on_completed(node);
            }

            self.completed.store(false, Ordering::SeqCst);
            let completed = Arc::clone(&self.completed);
            let wake_up = node.config.wake_up();

            let timer = self.timer.get_or_insert_with(TimerQueue::new);
            let id = timer.add(self.config.async_delay, move |aborted| {
                if !aborted {
                    completed.store(true, Ordering::SeqCst);
                    if let Some(wake_up) = wake_up {
                        wake_up.emit_signal();
                    }
                }
            });
            self.timer_id = Some(id);

            Ok(NodeStatus::Running)
        })
    }

    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            match self.completed.load(Ordering::SeqCst) {
                true => {
                    self.timer_id = None;
                    self.on_completed(node)
                }
                false => Ok(NodeStatus::Running),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let _ = node;
            if let (Some(timer), Some(id)) = (&self.timer, self.timer_id.take()) {
                timer.cancel(id);
            }
            self.completed.store(false, Ordering::SeqCst);
        })
    }
}
