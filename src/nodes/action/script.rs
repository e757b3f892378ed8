use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeResult},
    scripting::{truthy, Script},
};

/// Compile the `code` port, caching the program until the port text
/// changes.
#[derive(Default)]
struct CompiledCode {
    cache: Option<(String, Script)>,
}

impl CompiledCode {
    fn compile(&mut self, node: &mut NodeData) -> NodeResult<Script> {
        let code: String = node.config.get_input("code")?;

        if let Some((cached_source, script)) = &self.cache {
            if cached_source == &code {
                return Ok(script.clone());
            }
        }

        let script = Script::parse(&code)?;
        self.cache = Some((code, script.clone()));
        Ok(script)
    }
}

/// Executes the script in the `code` port and returns `Success`.
#[derive(Default)]
pub struct ScriptNode {
    compiled: CompiledCode,
}

impl NodeBehavior for ScriptNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let script = self.compiled.compile(node)?;
            let mut env = node.config.script_env();
            script.run(&mut env)?;
            Ok(NodeStatus::Success)
        })
    }
}

/// Evaluates the script in the `code` port as a condition: a truthy result
/// is `Success`, anything else `Failure`.
#[derive(Default)]
pub struct ScriptCondition {
    compiled: CompiledCode,
}

impl NodeBehavior for ScriptCondition {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let script = self.compiled.compile(node)?;
            let mut env = node.config.script_env();
            let result = script.run(&mut env)?;
            match truthy(&result)? {
                true => Ok(NodeStatus::Success),
                false => Ok(NodeStatus::Failure),
            }
        })
    }
}
