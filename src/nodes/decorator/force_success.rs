use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Any completion of the child is overridden to SUCCESS; RUNNING and
/// SKIPPED pass through.
#[derive(Default)]
pub struct ForceSuccessNode;

impl NodeBehavior for ForceSuccessNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            if child_status.is_completed() {
                node.reset_child().await;
                return Ok(NodeStatus::Success);
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
