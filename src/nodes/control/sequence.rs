use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The SequenceNode is used to tick children in an ordered sequence.
/// If any child returns RUNNING, previous children will NOT be ticked again.
///
/// - If all the children return SUCCESS, this node returns SUCCESS.
///
/// - If a child returns RUNNING, this node returns RUNNING.
///   Loop is NOT restarted, the same running child will be ticked again.
///
/// - If a child returns FAILURE, stop the loop and return FAILURE.
#[derive(Default)]
pub struct SequenceNode {
    child_idx: usize,
    all_skipped: bool,
}

impl NodeBehavior for SequenceNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            if node.status == NodeStatus::Idle {
                self.all_skipped = true;
            }

            node.set_status(NodeStatus::Running);

            while self.child_idx < node.children.len() {
                let child_status = node.children[self.child_idx].execute_tick().await?;

                self.all_skipped &= child_status == NodeStatus::Skipped;

                match child_status {
                    NodeStatus::Failure => {
                        node.reset_children().await;
                        self.child_idx = 0;
                        return Ok(NodeStatus::Failure);
                    }
                    NodeStatus::Success | NodeStatus::Skipped => {
                        self.child_idx += 1;
                    }
                    NodeStatus::Running => {
                        return Ok(NodeStatus::Running);
                    }
                    NodeStatus::Idle => {
                        return Err(NodeError::StatusError(
                            node.config.path.clone(),
                            "Idle".to_string(),
                        ))
                    }
                };
            }

            node.reset_children().await;
            self.child_idx = 0;

            match self.all_skipped {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Success),
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
