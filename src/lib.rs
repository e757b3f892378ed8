/*!
# ticktree

An embeddable behavior-tree runtime: author a tree of composable nodes,
load it from the XML tree format (or any parser producing the logical
model), and drive it with a deterministic tick traversal. Data flows
between nodes through a shared, typed [`Blackboard`]; an embedded scripting
sublanguage powers guards (`_skipIf`, `_while`, ...) and post-effects
(`_onSuccess`, ...).

## A minimal tree

```
use std::time::Duration;
use ticktree::{Factory, NodeStatus, macros::{define_ports, input_port}};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="answer := 42" />
                    <SaySomething message="{answer}" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    factory.register_simple_action(
        "SaySomething",
        define_ports!(input_port!("message")),
        |node| {
            let message: String = node.config.get_input("message")?;
            println!("{message}");
            Ok(NodeStatus::Success)
        },
    )?;

    let mut tree = factory.create_tree_from_text(xml)?;
    let status = tree.tick_while_running(Duration::from_millis(10)).await?;
    assert_eq!(status, NodeStatus::Success);
    Ok(())
}
```

## Custom nodes

Implement [`nodes::NodeBehavior`] for stateful logic (`start` runs on the
first tick, `tick` while `Running`, `halt` on interruption), or use
[`Factory::register_simple_action`] / [`Factory::register_simple_condition`]
for one-shot leaves. Long work belongs in a
[`nodes::action::ThreadedAction`], which runs on a blocking worker and
polls a halt flag.

## Driving the tree

- [`Tree::tick_exactly_once`] ticks the root a single time;
- [`Tree::tick_once`] also consumes pending wake-up signals;
- [`Tree::tick_while_running`] loops to a terminal outcome, sleeping
  between ticks on a wake-up signal any node (or thread) can raise.
*/

extern crate self as ticktree;

pub mod any;
pub mod basic_types;
pub mod blackboard;
pub mod factory;
pub mod macros;
pub mod model;
pub mod nodes;
pub mod scripting;
pub mod timer_queue;
pub mod tree;
pub mod wake_up;
pub mod xml;

// Re-exports for convenience
pub use any::Any;
pub use basic_types::{NodeKind, NodeStatus};
pub use blackboard::Blackboard;
pub use factory::Factory;
pub use nodes::NodeResult;
pub use tree::Tree;
