use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The RetryNode is used to execute a child several times if it fails.
///
/// If the child returns SUCCESS, the loop is stopped and this node
/// returns SUCCESS.
///
/// If the child returns FAILURE, this node will try again up to N times
/// (N is read from port "num_attempts", -1 means an infinite loop).
///
/// Example:
///
/// ```xml
/// <RetryUntilSuccessful num_attempts="3">
///     <OpenDoor/>
/// </RetryUntilSuccessful>
/// ```
#[derive(Default)]
pub struct RetryNode {
    try_count: usize,
    all_skipped: bool,
}

impl NodeBehavior for RetryNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let max_attempts: i32 = node.config.get_input("num_attempts")?;

            if matches!(node.status, NodeStatus::Idle) {
                self.all_skipped = true;
            }

            node.set_status(NodeStatus::Running);

            let mut do_loop = (self.try_count as i32) < max_attempts || max_attempts == -1;

            while do_loop {
                let child = node.child().ok_or(NodeError::ChildMissing)?;
                let child_status = child.execute_tick().await?;

                self.all_skipped &= matches!(child_status, NodeStatus::Skipped);

                match child_status {
                    NodeStatus::Success => {
                        self.try_count = 0;
                        node.reset_child().await;
                        return Ok(NodeStatus::Success);
                    }
                    NodeStatus::Failure => {
                        self.try_count += 1;
                        do_loop = (self.try_count as i32) < max_attempts || max_attempts == -1;
                        node.reset_child().await;
                    }
                    NodeStatus::Running => return Ok(NodeStatus::Running),
                    NodeStatus::Skipped => {
                        node.reset_child().await;
                        return Ok(NodeStatus::Skipped);
                    }
                    NodeStatus::Idle => {
                        return Err(NodeError::StatusError(
                            node.config.path.clone(),
                            "Idle".to_string(),
                        ))
                    }
                }
            }

            self.try_count = 0;

            match self.all_skipped {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Failure),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.try_count = 0;
            node.reset_child().await;
        })
    }
}
