use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The KeepRunningUntilFailureNode returns always FAILURE or RUNNING:
/// the child is re-ticked on every tick until it fails.
#[derive(Default)]
pub struct KeepRunningUntilFailureNode;

impl NodeBehavior for KeepRunningUntilFailureNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            match child_status {
                NodeStatus::Failure => {
                    node.reset_child().await;
                    Ok(NodeStatus::Failure)
                }
                NodeStatus::Success => {
                    node.reset_child().await;
                    Ok(NodeStatus::Running)
                }
                NodeStatus::Running => Ok(NodeStatus::Running),
                NodeStatus::Skipped => Ok(NodeStatus::Skipped),
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
