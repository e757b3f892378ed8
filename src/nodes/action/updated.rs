use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    blackboard::BlackboardError,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Condition that succeeds iff the blackboard entry named by the `entry`
/// port was written since the previous tick of this node.
#[derive(Default)]
pub struct WasEntryUpdated {
    last_seen: Option<u64>,
}

impl NodeBehavior for WasEntryUpdated {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let key: String = node.config.get_input("entry")?;
            let entry = node.config.blackboard.entry(&key).ok_or_else(|| {
                NodeError::BlackboardError(BlackboardError::KeyNotFound(key.clone()))
            })?;
            let sequence_id = entry.lock().unwrap().sequence_id;

            let updated = self.last_seen != Some(sequence_id);
            self.last_seen = Some(sequence_id);

            match updated {
                true => Ok(NodeStatus::Success),
                false => Ok(NodeStatus::Failure),
            }
        })
    }
}
