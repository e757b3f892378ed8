use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeResult},
};

/// Terminal constant: always returns `Success`.
#[derive(Default)]
pub struct AlwaysSuccess;

impl NodeBehavior for AlwaysSuccess {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let _ = node;
            Ok(NodeStatus::Success)
        })
    }
}

/// Terminal constant: always returns `Failure`.
#[derive(Default)]
pub struct AlwaysFailure;

impl NodeBehavior for AlwaysFailure {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let _ = node;
            Ok(NodeStatus::Failure)
        })
    }
}
