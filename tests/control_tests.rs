use std::time::Duration;

use ticktree::{basic_types::NodeStatus, Factory};

use crate::nodes::{count_of, new_counter, register_counting_action, register_test_nodes};


#[tokio::test]
async fn sequence_all_success() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <First />
                    <Second />
                    <Third />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let first = new_counter();
    let second = new_counter();
    let third = new_counter();
    register_counting_action(&mut factory, "First", first.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Second", second.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Third", third.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&first), 1);
    assert_eq!(count_of(&second), 1);
    assert_eq!(count_of(&third), 1);

    // After a completed tick every child is back to Idle
    for child in tree.root().children().unwrap() {
        assert_eq!(child.status(), NodeStatus::Idle);
    }
}

#[tokio::test]
async fn sequence_stops_on_failure() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <First />
                    <Failing />
                    <Third />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let first = new_counter();
    let failing = new_counter();
    let third = new_counter();
    register_counting_action(&mut factory, "First", first.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Failing", failing.clone(), NodeStatus::Failure);
    register_counting_action(&mut factory, "Third", third.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Failure);
    assert_eq!(count_of(&first), 1);
    assert_eq!(count_of(&failing), 1);
    assert_eq!(count_of(&third), 0);
}

#[tokio::test]
async fn sequence_resumes_at_running_child() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Sequence>
                    <First />
                    <RunForNode iters="2" />
                </Sequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);
    let first = new_counter();
    register_counting_action(&mut factory, "First", first.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    // Tick 1: First succeeds, RunFor starts
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    // Ticks 2..: the sequence resumes at the running child
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);

    assert_eq!(count_of(&first), 1);
}

#[tokio::test]
async fn fallback_returns_first_success() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Fallback>
                    <FailA />
                    <Succeeds />
                    <Never />
                </Fallback>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let fail_a = new_counter();
    let succeeds = new_counter();
    let never = new_counter();
    register_counting_action(&mut factory, "FailA", fail_a.clone(), NodeStatus::Failure);
    register_counting_action(&mut factory, "Succeeds", succeeds.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Never", never.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&fail_a), 1);
    assert_eq!(count_of(&succeeds), 1);
    assert_eq!(count_of(&never), 0);
}

#[tokio::test]
async fn sequence_with_memory_resumes_at_failure() {
    nodes::test_setup();

    // Scenario: A fails twice, then succeeds after a halt
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <SequenceWithMemory>
                    <SuccessThenFailure iters="0" name="A" />
                    <B />
                </SequenceWithMemory>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);
    let b_count = new_counter();
    register_counting_action(&mut factory, "B", b_count.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();

    // A (iters=0) immediately fails; the index stays on A
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);
    assert_eq!(count_of(&b_count), 0);

    tree.halt_tree().await;

    // Same structure, but now with a child that succeeds first
    let xml_ok = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="ok">
                <SequenceWithMemory>
                    <SuccessThenFailure iters="5" name="A" />
                    <B />
                </SequenceWithMemory>
            </BehaviorTree>
        </root>
    "#;
    factory.register_behavior_tree_from_text(xml_ok).unwrap();
    let mut tree = factory.create_tree("ok").unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);
    assert_eq!(count_of(&b_count), 1);
}

#[tokio::test]
async fn reactive_sequence_reticks_condition() {
    nodes::test_setup();

    // The first child is re-evaluated on every tick; the second child is
    // ticked only on the tick where the first returns Success.
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <ReactiveSequence>
                    <ScriptCondition code="flag > 0" />
                    <RunForNode iters="1" />
                </ReactiveSequence>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();
    blackboard.set("flag", 1i64).unwrap();

    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);

    // Condition flips: the running child is skipped over by the failure
    blackboard.set("flag", 0i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);

    // And back again: the action starts over
    blackboard.set("flag", 1i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);
}

#[tokio::test]
async fn reactive_fallback_stops_on_success() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <ReactiveFallback>
                    <ScriptCondition code="ok > 0" />
                    <RunForNode iters="1" status="Success" />
                </ReactiveFallback>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();
    blackboard.set("ok", 0i64).unwrap();

    // Condition fails, the action runs
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);

    // Condition succeeds: the fallback completes and the running action is
    // halted
    blackboard.set("ok", 1i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Success);

    for child in tree.root().children().unwrap() {
        assert_eq!(child.status(), NodeStatus::Idle);
    }
}

#[tokio::test]
async fn parallel_thresholds() {
    nodes::test_setup();

    // success_count=1: the first success wins and the rest is halted
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Parallel success_count="1">
                    <Wins />
                    <RunForNode iters="5" />
                </Parallel>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);
    let wins = new_counter();
    register_counting_action(&mut factory, "Wins", wins.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Success);
    assert_eq!(count_of(&wins), 1);

    // Default thresholds: all children must succeed, one failure fails it
    let xml = r#"
        <root main_tree_to_execute="other">
            <BehaviorTree ID="other">
                <Parallel>
                    <Wins2 />
                    <Fails />
                </Parallel>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let wins2 = new_counter();
    let fails = new_counter();
    register_counting_action(&mut factory, "Wins2", wins2.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Fails", fails.clone(), NodeStatus::Failure);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();
    assert_eq!(status, NodeStatus::Failure);
}

#[tokio::test]
async fn parallel_all_counts_failures() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <ParallelAll max_failures="2">
                    <Ok />
                    <Bad />
                    <Ok2 />
                </ParallelAll>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let ok = new_counter();
    let bad = new_counter();
    let ok2 = new_counter();
    register_counting_action(&mut factory, "Ok", ok.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Bad", bad.clone(), NodeStatus::Failure);
    register_counting_action(&mut factory, "Ok2", ok2.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let status = tree.tick_while_running(Duration::from_millis(10)).await.unwrap();

    // One failure is below max_failures=2
    assert_eq!(status, NodeStatus::Success);
    // No early termination: every child was ticked
    assert_eq!(count_of(&ok), 1);
    assert_eq!(count_of(&bad), 1);
    assert_eq!(count_of(&ok2), 1);
}

#[tokio::test]
async fn if_then_else_branches() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <IfThenElse>
                    <ScriptCondition code="choice > 0" />
                    <Then />
                    <Else />
                </IfThenElse>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let then_count = new_counter();
    let else_count = new_counter();
    register_counting_action(&mut factory, "Then", then_count.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "Else", else_count.clone(), NodeStatus::Success);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    tree.root_blackboard().set("choice", 1i64).unwrap();

    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&then_count), 1);
    assert_eq!(count_of(&else_count), 0);

    tree.root_blackboard().set("choice", 0i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&else_count), 1);
}

#[tokio::test]
async fn while_do_else_switches_branch() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <WhileDoElse>
                    <ScriptCondition code="go > 0" />
                    <RunForNode iters="10" />
                    <Else />
                </WhileDoElse>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    register_test_nodes(&mut factory);
    let else_count = new_counter();
    register_counting_action(&mut factory, "Else", else_count.clone(), NodeStatus::Failure);

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();
    blackboard.set("go", 1i64).unwrap();

    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Running);

    // The condition flips: the running branch is halted, the else branch
    // decides the outcome
    blackboard.set("go", 0i64).unwrap();
    assert_eq!(tree.tick_exactly_once().await.unwrap(), NodeStatus::Failure);
    assert_eq!(count_of(&else_count), 1);
}

#[tokio::test]
async fn switch_selects_case_and_default() {
    nodes::test_setup();

    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Switch3 variable="{var}" case_1="A" case_2="B" case_3="C">
                    <X1 />
                    <X2 />
                    <X3 />
                    <DefaultBranch />
                </Switch3>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let x1 = new_counter();
    let x2 = new_counter();
    let x3 = new_counter();
    let default_count = new_counter();
    register_counting_action(&mut factory, "X1", x1.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "X2", x2.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "X3", x3.clone(), NodeStatus::Success);
    register_counting_action(
        &mut factory,
        "DefaultBranch",
        default_count.clone(),
        NodeStatus::Success,
    );

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("var", "B".to_string()).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&x2), 1);

    blackboard.set("var", "Z".to_string()).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&x1), 0);
    assert_eq!(count_of(&x3), 0);
    assert_eq!(count_of(&default_count), 1);
}

#[tokio::test]
async fn switch_tolerates_unset_cases() {
    nodes::test_setup();

    // Only two of the three cases are bound; the unset one is skipped and
    // unmatched values land on the default child
    let xml = r#"
        <root main_tree_to_execute="main">
            <BehaviorTree ID="main">
                <Switch3 variable="{var}" case_1="1" case_2="42">
                    <X1 />
                    <X2 />
                    <X3 />
                    <DefaultBranch />
                </Switch3>
            </BehaviorTree>
        </root>
    "#;

    let mut factory = Factory::new();
    let x1 = new_counter();
    let x2 = new_counter();
    let x3 = new_counter();
    let default_count = new_counter();
    register_counting_action(&mut factory, "X1", x1.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "X2", x2.clone(), NodeStatus::Success);
    register_counting_action(&mut factory, "X3", x3.clone(), NodeStatus::Success);
    register_counting_action(
        &mut factory,
        "DefaultBranch",
        default_count.clone(),
        NodeStatus::Success,
    );

    let mut tree = factory.create_tree_from_text(xml).unwrap();
    let mut blackboard = tree.root_blackboard();

    blackboard.set("var", 42i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&x2), 1);

    blackboard.set("var", 7i64).unwrap();
    assert_eq!(
        tree.tick_while_running(Duration::from_millis(10)).await.unwrap(),
        NodeStatus::Success
    );
    assert_eq!(count_of(&x3), 0);
    assert_eq!(count_of(&default_count), 1);
}
