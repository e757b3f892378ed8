use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The ReactiveSequence re-evaluates all its children from the first on
/// every tick:
///
/// - If a child returns RUNNING, halt every sibling and return RUNNING.
/// - If a child returns SUCCESS, tick the next sibling.
/// - If a child returns FAILURE, halt all children and return FAILURE.
///
/// If all the children return SUCCESS, this node returns SUCCESS.
///
/// With the strict check enabled (the default), at most one child may be
/// the running one; a second child returning RUNNING is a logic error.
pub struct ReactiveSequenceNode {
    running_child: i32,
    strict: bool,
}

impl Default for ReactiveSequenceNode {
    fn default() -> Self {
        Self {
            running_child: -1,
            strict: true,
        }
    }
}

impl NodeBehavior for ReactiveSequenceNode {
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
                                    "[ReactiveSequence]: only a single child can return Running."
                                        .to_string(),
                                ));
                            }
                            self.running_child = index as i32;
                        }
                        return Ok(NodeStatus::Running);
                    }
                    NodeStatus::Failure => {
                        node.reset_children().await;
                        self.running_child = -1;
                        return Ok(NodeStatus::Failure);
                    }
                    // Do nothing on Success
                    NodeStatus::Success => {}
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
                false => Ok(NodeStatus::Success),
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
