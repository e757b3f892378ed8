use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use ticktree::{
    basic_types::{NodeKind, NodeStatus},
    factory::NodeType,
    macros::{define_ports, input_port, output_port},
    nodes::action::ThreadedAction,
    Factory,
};

use crate::nodes::register_test_nodes;


#[tokio::test]
async fn hello_world_via_ports() {
    nodes::test_setup();

    // A "Think" action writes through its output port, "Say" reads the
    // same entry through its input port.
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Think text="{the_answer}" />
                    <Say message="{the_answer}" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();

    factory
        .register_simple_action(
            "Think",
            define_ports!(output_port!("text")),
            |node| {
                node.config
                    .set_output("text", String::from("The answer is 42"))?;
                Ok(NodeStatus::Success)
            },
        )
        .unwrap();

    let heard: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = heard.clone();
    factory
        .register_simple_action(
            "Say",
            define_ports!(input_port!("message")),
            move |node| {
                let message: String = node.config.get_input("message")?;
                sink.lock().unwrap().push(message);
                Ok(NodeStatus::Success)
            },
        )
        .unwrap();

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(*heard.lock().unwrap(), vec!["The answer is 42".to_string()]);
}

#[tokio::test]
async fn writing_to_a_literal_output_port_fails() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Think text="not a pointer" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    factory
        .register_simple_action(
            "Think",
            define_ports!(output_port!("text")),
            |node| {
                node.config.set_output("text", String::from("x"))?;
                Ok(NodeStatus::Success)
            },
        )
        .unwrap();

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    assert!(tree.tick_while_running(Duration::from_millis(10)).await.is_err());
}

#[tokio::test]
async fn set_blackboard_copies_between_entries() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="source := 99" />
                    <SetBlackboard value="{source}" output_key="{copy}" />
                    <SetBlackboard value="literal" output_key="{text}" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);

    let mut blackboard = tree.root_blackboard();
    assert_eq!(blackboard.get::<i64>("copy").unwrap(), 99);
    assert_eq!(blackboard.get::<String>("text").unwrap(), "literal");
}

#[tokio::test]
async fn json_snapshot_round_trip() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Script code="count := 3; name := 'rover'; speed := 1.5" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();
    tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    let snapshot = tree.export_to_json();

    // Mutate, then restore
    let mut blackboard = tree.root_blackboard();
    blackboard.set("count", 77i64).unwrap();
    blackboard.set("name", String::from("changed")).unwrap();

    tree.import_from_json(&snapshot).unwrap();

    assert_eq!(blackboard.get::<i64>("count").unwrap(), 3);
    assert_eq!(blackboard.get::<String>("name").unwrap(), "rover");
    assert_eq!(blackboard.get::<f64>("speed").unwrap(), 1.5);
}

#[tokio::test]
async fn blackboard_backup_and_restore() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="runs := runs + 1" />
                    <SubTree ID="inner" local="{runs}" />
                </Sequence>
            </BehaviorTree>

            <BehaviorTree ID="inner">
                <Script code="local := local + 10" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let mut blackboard = tree.root_blackboard();
    blackboard.set("runs", 0i64).unwrap();

    tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(blackboard.get::<i64>("runs").unwrap(), 11);

    let backup = tree.blackboard_backup();

    tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(blackboard.get::<i64>("runs").unwrap(), 22);

    tree.blackboard_restore(&backup).unwrap();
    assert_eq!(blackboard.get::<i64>("runs").unwrap(), 11);
}

#[tokio::test]
async fn stamped_reads_observe_writes() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Script code="beat := beat + 1" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let mut blackboard = tree.root_blackboard();
    blackboard.set("beat", 0i64).unwrap();

    let (_, first) = blackboard.get_stamped::<i64>("beat").unwrap();

    tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    let (value, second) = blackboard.get_stamped::<i64>("beat").unwrap();

    assert_eq!(value, 1);
    assert!(second.sequence_id > first.sequence_id);
}

#[tokio::test]
async fn threaded_action_runs_off_thread() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Crunch result="{sum}" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    factory
        .register_builder(
            "Crunch",
            NodeKind::Action,
            NodeType::StatefulAction,
            define_ports!(output_port!("result")),
            Arc::new(|_config| {
                Ok(Box::new(ThreadedAction::new(|mut context| {
                    let mut sum = 0i64;
                    for i in 1..=1000 {
                        if context.is_halt_requested() {
                            return Ok(NodeStatus::Failure);
                        }
                        sum += i;
                    }
                    std::thread::sleep(Duration::from_millis(20));
                    context.config.set_output("result", sum)?;
                    Ok(NodeStatus::Success)
                })))
            }),
        )
        .unwrap();

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(tree.root_blackboard().get::<i64>("sum").unwrap(), 500500);
}

#[tokio::test]
async fn sleep_completes_via_wake_up() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sleep msec="80" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    // The driver would sleep for 30s per tick; the timer's wake-up signal
    // must cut that short.
    let begin = Instant::now();
    let status = tree.tick_while_running(Duration::from_secs(30)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    let elapsed = begin.elapsed();
    assert!(elapsed >= Duration::from_millis(80));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn halt_tree_resets_everything() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <RunForNode iters="100" />
                    <AlwaysSuccess />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.root().status(), NodeStatus::Running);

    tree.halt_tree().await;

    let mut statuses = Vec::new();
    tree.for_each_node_mut(&mut |node| statuses.push(node.status()));
    assert!(statuses.iter().all(|status| *status == NodeStatus::Idle));

    // The tree restarts cleanly
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
}

#[tokio::test]
async fn status_observers_see_transitions() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <AlwaysSuccess />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let transitions: Arc<Mutex<Vec<(NodeStatus, NodeStatus)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let recorded = transitions.clone();
    tree.subscribe_status_changes(Arc::new(move |_timestamp, _node, prev, new| {
        recorded.lock().unwrap().push((prev, new));
    }));

    tree.tick_exactly_once().await.unwrap();

    let transitions = transitions.lock().unwrap();
    assert!(transitions.contains(&(NodeStatus::Idle, NodeStatus::Success)));
}

#[tokio::test]
async fn root_blackboard_redirect() {
    nodes::test_setup();

    // The @ prefix forces the write onto the root blackboard, across two
    // subtree levels.
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <SubTree ID="deep" />
                    <ScriptCondition code="marker == 7" />
                </Sequence>
            </BehaviorTree>

            <BehaviorTree ID="deep">
                <Script code="@marker := 7" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);
    assert_eq!(tree.root_blackboard().get::<i64>("marker").unwrap(), 7);
}
