use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    blackboard::BlackboardError,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Compares the current `sequence_id` of the entry named by the `entry`
/// port with the one seen on the previous tick. When it changed the child
/// is ticked; otherwise the configured status is returned.
///
/// Registered as `SkipUnlessUpdated` (returns SKIPPED) and
/// `WaitValueUpdate` (returns RUNNING).
pub struct EntryUpdatedNode {
    if_not_updated: NodeStatus,
    last_seen: Option<u64>,
    still_executing_child: bool,
}

impl EntryUpdatedNode {
    pub fn new(if_not_updated: NodeStatus) -> EntryUpdatedNode {
        Self {
            if_not_updated,
            last_seen: None,
            still_executing_child: false,
        }
    }
}

impl NodeBehavior for EntryUpdatedNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            // A running child keeps being ticked regardless of new writes
            if !self.still_executing_child {
                let key: String = node.config.get_input("entry")?;
                let entry = node.config.blackboard.entry(&key).ok_or_else(|| {
                    NodeError::BlackboardError(BlackboardError::KeyNotFound(key.clone()))
                })?;
                let sequence_id = entry.lock().unwrap().sequence_id;

                let updated = self.last_seen != Some(sequence_id);
                self.last_seen = Some(sequence_id);

                if !updated {
                    return Ok(self.if_not_updated);
                }
            }

            node.set_status(NodeStatus::Running);

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;
            self.still_executing_child = child_status == NodeStatus::Running;

            if child_status.is_completed() {
                node.reset_child().await;
            }

            Ok(child_status)
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.still_executing_child = false;
            node.reset_child().await;
        })
    }
}
