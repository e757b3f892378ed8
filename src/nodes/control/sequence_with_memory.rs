use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Like `Sequence`, but the resume index survives a child failure:
/// subsequent ticks start again at the child that failed, not at the first
/// one. The index is kept even across `halt()`.
#[derive(Default)]
pub struct SequenceWithMemoryNode {
    current_child_idx: usize,
    all_skipped: bool,
}

impl NodeBehavior for SequenceWithMemoryNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            if node.status == NodeStatus::Idle {
                self.all_skipped = true;
            }

            node.set_status(NodeStatus::Running);

            while self.current_child_idx < node.children.len() {
                let child_status =
                    node.children[self.current_child_idx].execute_tick().await?;

                self.all_skipped &= child_status == NodeStatus::Skipped;

                match child_status {
                    NodeStatus::Failure => {
                        // DO NOT reset the index; halt the failed child and
                        // the ones after it
                        node.halt_children(self.current_child_idx).await?;
                        return Ok(NodeStatus::Failure);
                    }
                    NodeStatus::Success | NodeStatus::Skipped => {
                        self.current_child_idx += 1;
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
            self.current_child_idx = 0;

            match self.all_skipped {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Success),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        // The index is the memory: it survives halting
        Box::pin(async move {
            node.reset_children().await;
        })
    }
}
