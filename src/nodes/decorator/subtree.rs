use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Transparent wrapper around the root of a nested tree.
///
/// The nested tree runs against its own blackboard; the factory wires the
/// port remappings and the `_autoremap` flag onto that blackboard when the
/// node is instantiated, so at tick time this is a plain passthrough.
#[derive(Default)]
pub struct SubtreeNode;

impl NodeBehavior for SubtreeNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            if child_status.is_completed() {
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
