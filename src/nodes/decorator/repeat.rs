use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
};

/// The RepeatNode is used to execute a child several times, as long
/// as it succeeds.
///
/// To succeed, the child must return SUCCESS N times (port "num_cycles",
/// -1 means an infinite loop).
///
/// If the child returns FAILURE, the loop is stopped and this node
/// returns FAILURE.
#[derive(Default)]
pub struct RepeatNode {
    repeat_count: usize,
    all_skipped: bool,
}

impl NodeBehavior for RepeatNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let num_cycles: i32 = node.config.get_input("num_cycles")?;

            if matches!(node.status, NodeStatus::Idle) {
                self.all_skipped = true;
            }

            node.set_status(NodeStatus::Running);

            let mut do_loop = (self.repeat_count as i32) < num_cycles || num_cycles == -1;

            while do_loop {
                let child = node.child().ok_or(NodeError::ChildMissing)?;
                let child_status = child.execute_tick().await?;

                self.all_skipped &= matches!(child_status, NodeStatus::Skipped);

                match child_status {
                    NodeStatus::Success => {
                        self.repeat_count += 1;
                        do_loop = (self.repeat_count as i32) < num_cycles || num_cycles == -1;
                        node.reset_child().await;
                    }
                    NodeStatus::Failure => {
                        self.repeat_count = 0;
                        node.reset_child().await;
                        return Ok(NodeStatus::Failure);
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

            self.repeat_count = 0;

            match self.all_skipped {
                true => Ok(NodeStatus::Skipped),
                false => Ok(NodeStatus::Success),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.repeat_count = 0;
            node.reset_child().await;
        })
    }
}
