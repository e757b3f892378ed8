use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use ticktree::{basic_types::NodeStatus, Factory};

use crate::nodes::{
    count_of, new_counter, register_counting_action, register_recording_action,
    register_test_nodes,
};


#[tokio::test]
async fn inverter_and_force_decorators() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Inverter>
                        <AlwaysFailure />
                    </Inverter>
                    <ForceSuccess>
                        <AlwaysFailure />
                    </ForceSuccess>
                    <Inverter>
                        <ForceFailure>
                            <AlwaysSuccess />
                        </ForceFailure>
                    </Inverter>
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);
}

#[tokio::test]
async fn repeat_until_count() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Repeat num_cycles="3">
                    <Work />
                </Repeat>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&work), 3);
}

#[tokio::test]
async fn retry_exhausts_attempts() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <RetryUntilSuccessful num_attempts="3">
                    <FailingAction />
                </RetryUntilSuccessful>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let attempts = new_counter();
    register_counting_action(&mut factory, "FailingAction", attempts.clone(), NodeStatus::Failure);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    // Exactly num_attempts child ticks, then Failure
    assert_eq!(status, NodeStatus::Failure);
    assert_eq!(count_of(&attempts), 3);

    // The attempt counter reset: a second run performs 3 fresh attempts
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Failure);
    assert_eq!(count_of(&attempts), 6);
}

#[tokio::test]
async fn retry_stops_on_success() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <RetryUntilSuccessful num_attempts="-1">
                    <Flaky iters="2" />
                </RetryUntilSuccessful>
            </BehaviorTree>
        </root>
    "#;

    // Inverted SuccessThenFailure: fails twice, then succeeds
    let mut factory = Factory::new();
    let calls = new_counter();
    let calls_clone = calls.clone();
    factory
        .register_simple_action("Flaky", ticktree::basic_types::PortsList::new(), move |_node| {
            let n = calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 2 {
                Ok(NodeStatus::Failure)
            } else {
                Ok(NodeStatus::Success)
            }
        })
        .unwrap();

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&calls), 3);
}

#[tokio::test]
async fn keep_running_until_failure_loops() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <KeepRunningUntilFailure>
                    <SuccessThenFailure iters="3" />
                </KeepRunningUntilFailure>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Failure);
}

#[tokio::test]
async fn run_once_skips_afterwards() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <RunOnce>
                    <Work />
                </RunOnce>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Skipped);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Skipped);
    assert_eq!(count_of(&work), 1);
}

#[tokio::test]
async fn run_once_can_remember_status() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <RunOnce then_skip="false">
                    <Fails />
                </RunOnce>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let fails = new_counter();
    register_counting_action(&mut factory, "Fails", fails.clone(), NodeStatus::Failure);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);
    assert_eq!(count_of(&fails), 1);
}

#[tokio::test]
async fn timeout_halts_slow_child() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Timeout msec="50">
                    <Sleep msec="2000" />
                </Timeout>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    // Count how often the sleeping child is halted (Running -> Idle)
    let halts = new_counter();
    let halts_clone = halts.clone();
    tree.for_each_node_mut(&mut |node| {
        if node.registration_id() == "Sleep" {
            let halts = halts_clone.clone();
            node.add_status_observer(Arc::new(move |_, _, prev, new| {
                if prev == NodeStatus::Running && new == NodeStatus::Idle {
                    halts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }));
        }
    });

    let begin = Instant::now();
    let status = tree.tick_while_running(Duration::from_secs(5)).await.unwrap();

    assert_eq!(status, NodeStatus::Failure);
    // The wake-up signal cut the sleep short: well under the child's 2s
    assert!(begin.elapsed() < Duration::from_millis(1500));
    assert_eq!(count_of(&halts), 1);
}

#[tokio::test]
async fn timeout_passes_fast_child() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Timeout msec="1000">
                    <Quick />
                </Timeout>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let quick = new_counter();
    register_counting_action(&mut factory, "Quick", quick.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&quick), 1);
}

#[tokio::test]
async fn delay_postpones_child() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Delay delay_msec="50">
                    <Work />
                </Delay>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let begin = Instant::now();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(count_of(&work), 0);

    let status = tree.tick_while_running(Duration::from_secs(5)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&work), 1);
    assert!(begin.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn loop_consumes_queue() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <LoopString queue="alpha;beta;gamma" value="{item}">
                    <Recorder msg="{item}" />
                </LoopString>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let sink = Arc::new(Mutex::new(Vec::new()));
    register_recording_action(&mut factory, "Recorder", sink.clone());

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(
        *sink.lock().unwrap(),
        vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]
    );
}

#[tokio::test]
async fn precondition_gates_child() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Precondition if="level >= 3" else="FAILURE">
                    <Work />
                </Precondition>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("level", 1i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Failure
    );
    assert_eq!(count_of(&work), 0);

    blackboard.set("level", 5i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&work), 1);
}

#[tokio::test]
async fn skip_unless_updated() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <SkipUnlessUpdated entry="watched">
                    <Work />
                </SkipUnlessUpdated>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();
    blackboard.set("watched", 0i64).unwrap();

    // First sight of the entry counts as an update
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);
    assert_eq!(count_of(&work), 1);

    // No new write: skipped
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Skipped);
    assert_eq!(count_of(&work), 1);

    // A write re-arms it
    blackboard.set("watched", 1i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);
    assert_eq!(count_of(&work), 2);
}

#[tokio::test]
async fn subtree_remaps_ports() {
    nodes::test_setup();

    // Scenario: the outer {greeting} is visible inside as {message}
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="greeting := 'hello'" />
                    <SubTree ID="talker" message="{greeting}" />
                </Sequence>
            </BehaviorTree>

            <BehaviorTree ID="talker">
                <Recorder msg="{message}" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let sink = Arc::new(Mutex::new(Vec::new()));
    register_recording_action(&mut factory, "Recorder", sink.clone());

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(*sink.lock().unwrap(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn subtree_auto_remap() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="message := 'direct'" />
                    <SubTree ID="talker" _autoremap="true" />
                </Sequence>
            </BehaviorTree>

            <BehaviorTree ID="talker">
                <Recorder msg="{message}" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let sink = Arc::new(Mutex::new(Vec::new()));
    register_recording_action(&mut factory, "Recorder", sink.clone());

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(*sink.lock().unwrap(), vec!["direct".to_string()]);
}
