use std::collections::HashSet;

use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Ticks every not-yet-completed child on each tick, with no early
/// termination: the node completes only after all children have. It then
/// returns FAILURE when failures reached `max_failures`, SUCCESS otherwise.
/// A negative `max_failures` is Python-indexed against the child count.
#[derive(Default)]
pub struct ParallelAllNode {
    completed: HashSet<usize>,
    failure_count: usize,
}

impl NodeBehavior for ParallelAllNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let raw_max_failures: i32 = node.config.get_input("max_failures")?;

            let children_count = node.children.len();
            let failure_threshold = if raw_max_failures < 0 {
                (children_count as i64 + raw_max_failures as i64 + 1).max(0) as usize
            } else {
                raw_max_failures as usize
            };

            if children_count < failure_threshold {
                return Err(NodeError::NodeStructureError(
                    "[ParallelAll]: number of children is less than the failure threshold. Can never fail."
                        .to_string(),
                ));
            }

            node.set_status(NodeStatus::Running);

            let mut skipped_count = 0usize;

            for i in 0..children_count {
                if self.completed.contains(&i) {
                    continue;
                }

                let child_status = node.children[i].execute_tick().await?;

                match child_status {
                    NodeStatus::Success => {
                        self.completed.insert(i);
                    }
                    NodeStatus::Failure => {
                        self.completed.insert(i);
                        self.failure_count += 1;
                    }
                    NodeStatus::Skipped => {
                        skipped_count += 1;
                    }
                    NodeStatus::Running => {}
                    NodeStatus::Idle => {
                        return Err(NodeError::StatusError(
                            node.config.path.clone(),
                            "Idle".to_string(),
                        ));
                    }
                }
            }

            if skipped_count == children_count {
                return Ok(NodeStatus::Skipped);
            }

            if self.completed.len() + skipped_count < children_count {
                return Ok(NodeStatus::Running);
            }

            // All children completed
            let failed = self.failure_count >= failure_threshold && failure_threshold > 0;
            self.completed.clear();
            self.failure_count = 0;
            node.reset_children().await;

            match failed {
                true => Ok(NodeStatus::Failure),
                false => Ok(NodeStatus::Success),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.completed.clear();
            self.failure_count = 0;
            node.reset_children().await;
        })
    }
}
