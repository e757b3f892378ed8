use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use crate::{
    basic_types::{FromString, NodeStatus},
    blackboard::BlackboardString,
    nodes::{NodeBehavior, NodeConfig, NodeData, NodeError, NodeResult},
};

/// Queue shared between the `Loop` decorator and its producers. Popping
/// mutates the queue in place without copying it.
pub type SharedQueue<T> = Arc<Mutex<VecDeque<T>>>;

impl<T> FromString for SharedQueue<T>
where
    T: FromString + Send + 'static,
{
    type Err = <T as FromString>::Err;

    fn from_string(value: impl AsRef<str>) -> Result<SharedQueue<T>, Self::Err> {
        let mut queue = VecDeque::new();
        for part in value.as_ref().split(';') {
            queue.push_back(T::from_string(part)?);
        }
        Ok(Arc::new(Mutex::new(queue)))
    }
}

/// Pops the front element of the `queue` port into the `value` output port
/// and ticks the child once per element, as long as elements are left.
/// An empty queue completes with the `if_empty` status (default SUCCESS).
///
/// Registered for the common element types as `LoopInt`, `LoopDouble`,
/// `LoopString` and `LoopBool`.
pub struct LoopNode<T> {
    child_running: bool,
    /// Queue parsed from a literal port value, consumed across activations.
    static_queue: Option<SharedQueue<T>>,
    current_queue: Option<SharedQueue<T>>,
}

impl<T> LoopNode<T>
where
    T: Clone + Send + Sync + FromString + 'static,
{
    /// A literal (non-pointer) `queue` port is parsed once, here.
    pub fn from_config(config: &NodeConfig) -> Result<LoopNode<T>, NodeError> {
        let static_queue = match config.raw_input("queue") {
            Some(raw) if !raw.is_bb_pointer() && !raw.is_empty() => {
                Some(SharedQueue::<T>::from_string(raw).map_err(|_| {
                    NodeError::PortValueParseError(
                        "queue".to_string(),
                        std::any::type_name::<SharedQueue<T>>().to_string(),
                    )
                })?)
            }
            _ => None,
        };

        Ok(Self {
            child_running: false,
            static_queue,
            current_queue: None,
        })
    }
}

impl<T> NodeBehavior for LoopNode<T>
where
    T: Clone + Send + Sync + FromString + 'static,
{
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            if node.status == NodeStatus::Idle {
                self.child_running = false;
                if let Some(static_queue) = &self.static_queue {
                    self.current_queue = Some(Arc::clone(static_queue));
                }
            }

            // Pop a value, unless the child is still busy with the last one
            let mut popped = false;
            if !self.child_running {
                if self.static_queue.is_none() {
                    self.current_queue = node.config.get_input::<SharedQueue<T>>("queue").ok();
                }

                let front = self
                    .current_queue
                    .as_ref()
                    .and_then(|queue| queue.lock().unwrap().pop_front());
                if let Some(value) = front {
                    popped = true;
                    node.config.set_output("value", value)?;
                }
            }

            if !popped && !self.child_running {
                return Ok(node.config.get_input::<NodeStatus>("if_empty")?);
            }

            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;
            self.child_running = child_status == NodeStatus::Running;

            if child_status.is_completed() {
                node.reset_child().await;
            }

            match child_status {
                NodeStatus::Failure => Ok(NodeStatus::Failure),
                _ => Ok(NodeStatus::Running),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.child_running = false;
            node.reset_child().await;
        })
    }
}
