use std::time::Duration;

use ticktree::{basic_types::NodeStatus, Factory};

use crate::nodes::{count_of, new_counter, register_counting_action};


#[tokio::test]
async fn script_node_writes_blackboard() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="answer := 6 * 7; label := 'the answer'" />
                    <Script code="answer += 1" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let mut tree = factory.create_tree_from_text(xml).unwrap();

    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);

    let mut blackboard = tree.root_blackboard();
    assert_eq!(blackboard.get::<i64>("answer").unwrap(), 43);
    assert_eq!(blackboard.get::<String>("label").unwrap(), "the answer");
}

#[tokio::test]
async fn script_condition_gates() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Fallback>
                    <ScriptCondition code="battery < 20" />
                    <Work />
                </Fallback>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("battery", 15i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&work), 0);

    blackboard.set("battery", 80i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&work), 1);
}

#[tokio::test]
async fn skip_if_precondition() {
    nodes::test_setup();

    // Scenario: with counter < 3 the child runs, afterwards it is skipped
    // without being entered
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Work _skipIf="counter >= 3" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("counter", 2i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&work), 1);

    blackboard.set("counter", 3i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Skipped
    );
    assert_eq!(count_of(&work), 1);
}

#[tokio::test]
async fn success_if_skips_the_tick() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Work _successIf="shortcut == 1" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Failure);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("shortcut", 1i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    // The actual tick never ran
    assert_eq!(count_of(&work), 0);

    blackboard.set("shortcut", 0i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Failure
    );
    assert_eq!(count_of(&work), 1);
}

#[tokio::test]
async fn post_conditions_fire_on_outcome() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Fallback>
                    <Fails _onFailure="errors := errors + 1" _post="ticks := ticks + 1" />
                    <Works _onSuccess="wins := wins + 1" _post="ticks := ticks + 1" />
                </Fallback>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let fails = new_counter();
    let works = new_counter();
    register_counting_action(&mut factory, "Fails", fails.clone(), NodeStatus::Failure);
    register_counting_action(&mut factory, "Works", works.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();
    blackboard.set("errors", 0i64).unwrap();
    blackboard.set("wins", 0i64).unwrap();
    blackboard.set("ticks", 0i64).unwrap();

    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);

    assert_eq!(blackboard.get::<i64>("errors").unwrap(), 1);
    assert_eq!(blackboard.get::<i64>("wins").unwrap(), 1);
    assert_eq!(blackboard.get::<i64>("ticks").unwrap(), 2);
}

#[tokio::test]
async fn while_condition_halts_running_node() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <RunForNode iters="10" _while="keep_going == 1" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    nodes::register_test_nodes(&mut factory);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("keep_going", 1i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);

    // The guard turns false while the node is RUNNING: it is halted and the
    // tick reports Skipped
    blackboard.set("keep_going", 0i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Skipped);
    assert_eq!(tree.root().status(), NodeStatus::Idle);
}

#[tokio::test]
async fn failure_if_precondition() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Work _failureIf="fuel <= 0" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("fuel", 0i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Failure
    );
    assert_eq!(count_of(&work), 0);
}

#[tokio::test]
async fn scripting_enums_resolve_in_scripts() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <Script code="color := BLUE" />
                    <ScriptCondition code="color == BLUE" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    factory.register_scripting_enum("RED", 1).unwrap();
    factory.register_scripting_enum("BLUE", 2).unwrap();
    // Same value twice is fine, a different one is not
    factory.register_scripting_enum("BLUE", 2).unwrap();
    assert!(factory.register_scripting_enum("BLUE", 9).is_err());

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);
    assert_eq!(tree.root_blackboard().get::<i64>("color").unwrap(), 2);
}

#[tokio::test]
async fn malformed_condition_script_fails_instantiation() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Work _skipIf="counter >=" />
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let work = new_counter();
    register_counting_action(&mut factory, "Work", work.clone(), NodeStatus::Success);

    assert!(factory.create_tree_from_text(xml).is_err());
}
