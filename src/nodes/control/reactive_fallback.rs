use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Dual of `ReactiveSequence`: all children are re-evaluated from the first
/// on every tick, a SUCCESS terminates with SUCCESS, a FAILURE moves on to
/// the next sibling, and a RUNNING child halts everything else. If all the
/// children return FAILURE, this node returns FAILURE.
pub struct ReactiveFallbackNode {
    running_child: i32,
    strict: bool,
}

impl Default for ReactiveFallbackNode {
    fn default() -> Self {
        Self {
            running_child: -1,
            strict: true,
        }
    }
}

impl NodeBehavior for ReactiveFallbackNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let mut all_skipped = true;

            node.set_status(NodeStatus::Running);

            for index in 0..node.children.len() {
                let child_status = node.children[index].execute_tick().await?;

                all_skipped &= child_status == NodeStatus::Skipped;

                match child_status {
                    NodeStatus::Running => {
                        for i in 0..node.children.len() {
                            if i != index {
                                node.halt_child_idx(i).await?;
                            }
                        }
                        if self.running_child == -1 {
                            self.running_child = index as i32;
                        } else if self.running_child != index as i32 {
                            if self.strict {
                                return Err(NodeError::NodeStructureError(
                                    "[ReactiveFallback]: only a single child can return Running."
                                        .to_string(),
                                ));
                            }
                            self.running_child = index as i32;
                        }
                        return Ok(NodeStatus::Running);
                    }
                    NodeStatus::Success => {
                        node.reset_children().await;
                        self.running_child = -1;
                        return Ok(NodeStatus::Success);
                    }
                    // Do nothing on Failure, try the next sibling
                    NodeStatus::Failure => {}
                    NodeStatus::Skipped => {
                        node.halt_child_idx(index).await?;
                    }
                    NodeStatus::Idle => {
                        return Err(NodeError::StatusError(
                            node.config.path.clone(),
                            "Idle".to_string(),
                        ));
                    }
                }
            }

            node.reset_children().await;
            self.running_child = -1;

            match all_skipped {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Failure),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.running_child = -1;
            node.reset_children().await;
        })
    }
}
