use std::collections::HashSet;

use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// Ticks every not-yet-completed child each tick and completes as soon as a
/// threshold is crossed, halting the children that are still running.
///
/// Ports:
/// - `success_count` (default -1): successes needed for SUCCESS. Negative
///   values count from the end, Python style, so -1 means "all children".
/// - `failure_count` (default 1): failures needed for FAILURE.
#[derive(Default)]
pub struct ParallelNode {
    completed: HashSet<usize>,
    success_count: usize,
    failure_count: usize,
}

impl ParallelNode {
    fn clear(&mut self) {
        self.completed.clear();
        self.success_count = 0;
        self.failure_count = 0;
    }
}

fn threshold(children: usize, raw: i32) -> usize {
    if raw < 0 {
        (children as i64 + raw as i64 + 1).max(0) as usize
    } else {
        raw as usize
    }
}

impl NodeBehavior for ParallelNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let raw_success: i32 = node.config.get_input("success_count")?;
            let raw_failure: i32 = node.config.get_input("failure_count")?;

            let children_count = node.children.len();
            let success_threshold = threshold(children_count, raw_success);
            let failure_threshold = threshold(children_count, raw_failure);

            if children_count < success_threshold {
                return Err(NodeError::NodeStructureError(
                    "[Parallel]: number of children is less than the success threshold. Can never succeed."
                        .to_string(),
                ));
            }
            if children_count < failure_threshold {
                return Err(NodeError::NodeStructureError(
                    "[Parallel]: number of children is less than the failure threshold. Can never fail."
                        .to_string(),
                ));
            }

            node.set_status(NodeStatus::Running);

            let mut skipped_count = 0usize;

            for i in 0..children_count {
                if !self.completed.contains(&i) {
                    let child_status = node.children[i].execute_tick().await?;

                    match child_status {
                        NodeStatus::Skipped => {
                            skipped_count += 1;
                        }
                        NodeStatus::Success => {
                            self.completed.insert(i);
                            self.success_count += 1;
                        }
                        NodeStatus::Failure => {
                            self.completed.insert(i);
                            self.failure_count += 1;
                        }
                        // Still working. Check the next
                        NodeStatus::Running => {}
                        NodeStatus::Idle => {
                            return Err(NodeError::StatusError(
                                node.config.path.clone(),
                                "Idle".to_string(),
                            ));
                        }
                    }
                }

                if self.success_count >= success_threshold
                    || (raw_success < 0
                        && self.success_count + skipped_count >= success_threshold)
                {
                    self.clear();
                    node.reset_children().await;
                    return Ok(NodeStatus::Success);
                }

                // It fails when succeeding is no longer possible, or when the
                // failure threshold is reached
                if children_count - self.failure_count < success_threshold
                    || self.failure_count == failure_threshold
                {
                    self.clear();
                    node.reset_children().await;
                    return Ok(NodeStatus::Failure);
                }
            }

            match skipped_count == children_count {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Running),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.clear();
            node.reset_children().await;
        })
    }
}
