use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeResult},
};

/// Removes the entry named by the `key` port from the blackboard.
#[derive(Default)]
pub struct UnsetBlackboard;

impl NodeBehavior for UnsetBlackboard {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let key: String = node.config.get_input("key")?;
            node.config.blackboard.unset(&key);
            Ok(NodeStatus::Success)
        })
    }
}
