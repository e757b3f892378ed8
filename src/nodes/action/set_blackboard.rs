use futures::future::BoxFuture;

use crate::{
    basic_types::{get_remapped_key, NodeStatus},
    blackboard::BlackboardString,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Writes the `value` port into the key named by `output_key`.
///
/// When `value` is itself a blackboard pointer the source entry is copied
/// wholesale, preserving its type; a literal string goes through the
/// destination entry's converter when one is registered.
#[derive(Default)]
pub struct SetBlackboard;

impl NodeBehavior for SetBlackboard {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let output_raw = node
                .config
                .output_ports
                .get("output_key")
                .cloned()
                .ok_or_else(|| NodeError::PortError("output_key".to_string()))?;
            let output_key = match output_raw.as_str() {
                "=" | "{=}" => "output_key".to_string(),
                raw => raw
                    .strip_bb_pointer()
                    .ok_or_else(|| NodeError::OutputPortError("output_key".to_string()))?,
            };

            let input_raw = node
                .config
                .raw_input("value")
                .map(str::to_string)
                .ok_or_else(|| NodeError::PortError("value".to_string()))?;

            match get_remapped_key("value", &input_raw) {
                Some(source_key) => {
                    // Copy the source entry's Any, keeping its type
                    let entry = node
                        .config
                        .blackboard
                        .entry(&source_key)
                        .ok_or_else(|| {
                            NodeError::BlackboardError(
                                crate::blackboard::BlackboardError::KeyNotFound(source_key.clone()),
                            )
                        })?;
                    let value = entry.lock().unwrap().value.clone();
                    node.config.blackboard.set_any(&output_key, value)?;
                }
                None => {
                    // A literal: the typed-entry write path parses it when
                    // the destination has a converter
                    node.config.blackboard.set(&output_key, input_raw)?;
                }
            }

            Ok(NodeStatus::Success)
        })
    }
}
