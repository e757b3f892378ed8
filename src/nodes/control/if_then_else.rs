use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Must have exactly 2 or 3 children. Child 0 is the condition: on SUCCESS
/// the second child is ticked, on FAILURE the third one (or FAILURE is
/// returned when there is no else branch). The condition is NOT re-evaluated
/// once a branch was entered; see `WhileDoElse` for the reactive variant.
#[derive(Default)]
pub struct IfThenElseNode {
    child_idx: usize,
}

impl NodeBehavior for IfThenElseNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let children_count = node.children.len();
            if !(2..=3).contains(&children_count) {
                return Err(NodeError::NodeStructureError(
                    "[IfThenElse]: must have either 2 or 3 children".to_string(),
                ));
            }

            node.set_status(NodeStatus::Running);

            if self.child_idx == 0 {
                match node.children[0].execute_tick().await? {
                    NodeStatus::Success => self.child_idx = 1,
                    NodeStatus::Failure => {
                        if children_count == 3 {
                            self.child_idx = 2;
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
                }
            }

            let branch_status = node.children[self.child_idx].execute_tick().await?;
            match branch_status {
                NodeStatus::Running => Ok(NodeStatus::Running),
                status => {
                    node.reset_children().await;
                    self.child_idx = 0;
                    Ok(status)
                }
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.child_idx = 0;
            node.reset_children().await;
        })
    }
}
