use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::future::BoxFuture;
use log::debug;
use tokio::task::JoinHandle;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeConfig, NodeData, NodeError, NodeResult},
};

mod always;
mod script;
mod set_blackboard;
mod sleep;
mod test;
mod unset_blackboard;
mod updated;

pub use always::{AlwaysFailure, AlwaysSuccess};
pub use script::{ScriptCondition, ScriptNode};
pub use set_blackboard::SetBlackboard;
pub use sleep::SleepNode;
pub use test::{TestNode, TestNodeConfig};
pub use unset_blackboard::UnsetBlackboard;
pub use updated::WasEntryUpdated;

// =============================
// Simple leaves from closures
// =============================

pub type SimpleActionFn = Arc<dyn Fn(&mut NodeData) -> NodeResult + Send + Sync>;

/// Synchronous action built from a closure. The closure must complete in
/// one tick; returning `Running` is an error for this node type.
pub struct SimpleAction {
    tick_fn: SimpleActionFn,
}

impl SimpleAction {
    pub fn new(tick_fn: impl Fn(&mut NodeData) -> NodeResult + Send + Sync + 'static) -> Self {
        Self {
            tick_fn: Arc::new(tick_fn),
        }
    }

    pub fn from_shared(tick_fn: SimpleActionFn) -> Self {
        Self { tick_fn }
    }
}

impl NodeBehavior for SimpleAction {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move { (self.tick_fn)(node) })
    }
}

pub type SimpleConditionFn = Arc<dyn Fn(&mut NodeData) -> NodeResult<bool> + Send + Sync>;

/// Condition built from a closure: `true` maps to `Success`, `false` to
/// `Failure`.
pub struct SimpleCondition {
    check_fn: SimpleConditionFn,
}

impl SimpleCondition {
    pub fn new(
        check_fn: impl Fn(&mut NodeData) -> NodeResult<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            check_fn: Arc::new(check_fn),
        }
    }

    pub fn from_shared(check_fn: SimpleConditionFn) -> Self {
        Self { check_fn }
    }
}

impl NodeBehavior for SimpleCondition {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            match (self.check_fn)(node)? {
                true => Ok(NodeStatus::Success),
                false => Ok(NodeStatus::Failure),
            }
        })
    }
}

// =============================
// Threaded actions
// =============================

/// Handle given to the worker closure of a [`ThreadedAction`]. The worker
/// owns a clone of the node's configuration, so it can use ports and the
/// blackboard, and must poll [`ThreadedContext::is_halt_requested`] to stay
/// cancellable.
pub struct ThreadedContext {
    pub config: NodeConfig,
    halt_requested: Arc<AtomicBool>,
}

impl ThreadedContext {
    pub fn is_halt_requested(&self) -> bool {
        self.halt_requested.load(Ordering::SeqCst)
    }
}

pub type ThreadedWorkFn = Arc<dyn Fn(ThreadedContext) -> NodeResult + Send + Sync>;

/// Action whose work runs on a blocking worker thread.
///
/// The first tick spawns the worker and returns `Running`; subsequent ticks
/// poll it. Panics and errors inside the worker are captured and surface
/// from the next `execute_tick`. `halt()` requests a stop and joins, which
/// is bounded by the worker's own polling discipline.
pub struct ThreadedAction {
    work: ThreadedWorkFn,
    handle: Option<JoinHandle<NodeResult>>,
    halt_requested: Arc<AtomicBool>,
}

impl ThreadedAction {
    pub fn new(work: impl Fn(ThreadedContext) -> NodeResult + Send + Sync + 'static) -> Self {
        Self {
            work: Arc::new(work),
            handle: None,
            halt_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn harvest(&mut self) -> NodeResult {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(NodeStatus::Running),
        };

        match handle.await {
            Ok(result) => match result? {
                status @ (NodeStatus::Running | NodeStatus::Idle) => Err(NodeError::StatusError(
                    "ThreadedAction worker".to_string(),
                    status.to_string(),
                )),
                status => Ok(status),
            },
            Err(join_error) => Err(NodeError::WorkerError(join_error.to_string())),
        }
    }
}

impl NodeBehavior for ThreadedAction {
    fn start<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            self.halt_requested.store(false, Ordering::SeqCst);

            let context = ThreadedContext {
                config: node.config.clone(),
                halt_requested: Arc::clone(&self.halt_requested),
            };
            let work = Arc::clone(&self.work);
            let wake_up = node.config.wake_up();

            debug!("{}: spawning worker", node.config.path);
            self.handle = Some(tokio::task::spawn_blocking(move || {
                let result = work(context);
                if let Some(wake_up) = wake_up {
                    wake_up.emit_signal();
                }
                result
            }));

            Ok(NodeStatus::Running)
        })
    }

    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let _ = node;
            let finished = self.handle.as_ref().map(JoinHandle::is_finished);
            match finished {
                Some(true) => self.harvest().await,
                Some(false) => Ok(NodeStatus::Running),
                None => Err(NodeError::WorkerError(
                    "worker polled before start".to_string(),
                )),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let _ = node;
            self.halt_requested.store(true, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                // Join; the worker is responsible for noticing the request
                let _ = handle.await;
            }
        })
    }
}
