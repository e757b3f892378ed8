use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The InverterNode returns SUCCESS if child fails
/// or FAILURE if child succeeds.
/// RUNNING and SKIPPED status are propagated.
#[derive(Default)]
pub struct InverterNode;

impl NodeBehavior for InverterNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            match child_status {
                NodeStatus::Success => {
                    node.reset_child().await;
                    Ok(NodeStatus::Failure)
                }
                NodeStatus::Failure => {
                    node.reset_child().await;
                    Ok(NodeStatus::Success)
                }
                NodeStatus::Running | NodeStatus::Skipped => Ok(child_status),
                NodeStatus::Idle => Err(NodeError::StatusError(
                    node.config.path.clone(),
                    "Idle".to_string(),
                )),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            node.reset_child().await;
        })
    }
}
