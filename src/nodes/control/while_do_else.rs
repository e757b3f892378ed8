use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Reactive variant of `IfThenElse`: the condition (child 0) is re-ticked on
/// every tick, and when its outcome flips while a branch is RUNNING, that
/// branch is halted before the other branch is ticked.
#[derive(Default)]
pub struct WhileDoElseNode;

impl NodeBehavior for WhileDoElseNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let children_count = node.children.len();
            if !(2..=3).contains(&children_count) {
                return Err(NodeError::NodeStructureError(
                    "[WhileDoElse]: must have either 2 or 3 children".to_string(),
                ));
            }

            node.set_status(NodeStatus::Running);

            let condition_status = node.children[0].execute_tick().await?;
            let branch_idx = match condition_status {
                NodeStatus::Success => 1,
                NodeStatus::Failure => {
                    if children_count == 3 {
                        2
                    } else {
                        node.reset_children().await;
                        return Ok(NodeStatus::Failure);
                    }
                }
                NodeStatus::Running => return Ok(NodeStatus::Running),
                NodeStatus::Skipped => return Ok(NodeStatus::Skipped),
                NodeStatus::Idle => {
                    return Err(NodeError::StatusError(
                        node.config.path.clone(),
                        "Idle".to_string(),
                    ))
                }
            };

            // Halt the branch that is no longer selected
            let other_idx = if branch_idx == 1 { 2 } else { 1 };
            if other_idx < children_count {
                node.halt_child_idx(other_idx).await?;
            }

            let branch_status = node.children[branch_idx].execute_tick().await?;
            match branch_status {
                NodeStatus::Running => Ok(NodeStatus::Running),
                status => {
                    node.reset_children().await;
                    Ok(status)
                }
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            node.reset_children().await;
        })
    }
}
