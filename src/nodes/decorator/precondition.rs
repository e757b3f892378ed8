use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
    scripting::Script,
};

/// Ticks the child iff the script in the `if` port evaluates truthy;
/// otherwise returns the status in the `else` port (default FAILURE).
#[derive(Default)]
pub struct PreconditionNode {
    compiled: Option<(String, Script)>,
}

impl NodeBehavior for PreconditionNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let source: String = node.config.get_input("if")?;

            let script = match &self.compiled {
                Some((cached, script)) if cached == &source => script.clone(),
                _ => {
                    let script = Script::parse(&source)?;
                    self.compiled = Some((source, script.clone()));
                    script
                }
            };

            node.set_status(NodeStatus::Running);

            let mut env = node.config.script_env();
            if script.run_condition(&mut env)? {
                let child = node.child().ok_or(NodeError::ChildMissing)?;
                let child_status = child.execute_tick().await?;
                if child_status.is_completed() {
                    node.reset_child().await;
                }
                Ok(child_status)
            } else {
                Ok(node.config.get_input::<NodeStatus>("else")?)
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            node.reset_child().await;
        })
    }
}
