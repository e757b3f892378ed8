use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The FallbackNode is used to try different strategies until one succeeds.
/// If any child returns RUNNING, previous children will NOT be ticked again.
///
/// - If all the children return FAILURE, this node returns FAILURE.
///
/// - If a child returns RUNNING, this node returns RUNNING.
///
/// - If a child returns SUCCESS, stop the loop and return SUCCESS.
#[derive(Default)]
pub struct FallbackNode {
    child_idx: usize,
    all_skipped: bool,
}

impl NodeBehavior for FallbackNode {
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
                    NodeStatus::Success => {
                        node.reset_children().await;
                        self.child_idx = 0;
                        return Ok(NodeStatus::Success);
                    }
                    NodeStatus::Failure | NodeStatus::Skipped => {
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
                false => Ok(NodeStatus::Failure),
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
