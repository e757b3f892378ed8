use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The RunOnceNode ticks its child to completion a single time; afterwards
/// it either skips (`then_skip` port, the default) or keeps returning the
/// remembered result.
#[derive(Default)]
pub struct RunOnceNode {
    already_ticked: bool,
    returned_status: Option<NodeStatus>,
}

impl NodeBehavior for RunOnceNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let then_skip: bool = node.config.get_input("then_skip")?;

            if self.already_ticked {
                return match then_skip {
                    true => Ok(NodeStatus::Skipped),
                    // Remembered by construction when already_ticked is set
                    false => Ok(self.returned_status.unwrap_or(NodeStatus::Skipped)),
                };
            }

            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            if child_status.is_completed() {
                self.already_ticked = true;
                self.returned_status = Some(child_status);
                node.reset_child().await;
            }

            Ok(child_status)
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            node.reset_child().await;
        })
    }
}
