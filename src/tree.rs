use std::{sync::Arc, time::Duration};

use log::debug;
use thiserror::Error;

use crate::{
    basic_types::NodeStatus,
    blackboard::{Blackboard, BlackboardError},
    nodes::{NodeResult, StatusObserver, TreeNode},
    wake_up::WakeUpSignal,
};

/// One instantiated (sub)tree: its id in the model, the instance name
/// assigned during instantiation, and the blackboard it runs against. The
/// nodes themselves are owned by the tree's root node graph.
#[derive(Debug, Clone)]
pub struct Subtree {
    pub tree_id: String,
    pub instance_name: String,
    pub blackboard: Blackboard,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot holds {expected} subtrees, the tree has {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("snapshot refers to unknown subtree [{0}]")]
    UnknownSubtree(String),
    #[error("snapshot is not a JSON object")]
    NotAnObject,
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
}

enum TickOption {
    ExactlyOnce,
    OnceUnlessWokenUp,
    WhileRunning,
}

/// An executable behavior tree: the owned node graph plus one [`Subtree`]
/// record per instantiated tree (the first being the main one) and the
/// wake-up signal shared with every node.
#[derive(Debug)]
pub struct Tree {
    root: TreeNode,
    subtrees: Vec<Subtree>,
    wake_up: Arc<WakeUpSignal>,
}

impl Tree {
    pub(crate) fn new(root: TreeNode, subtrees: Vec<Subtree>, wake_up: Arc<WakeUpSignal>) -> Tree {
        Self {
            root,
            subtrees,
            wake_up,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut TreeNode {
        &mut self.root
    }

    pub fn subtrees(&self) -> &[Subtree] {
        &self.subtrees
    }

    /// The blackboard of the main tree.
    pub fn root_blackboard(&self) -> Blackboard {
        // At least one subtree exists by construction
        self.subtrees[0].blackboard.clone()
    }

    /// The signal nodes use to interrupt the driver's sleep. Producers
    /// outside the tree may raise it too.
    pub fn wake_up_signal(&self) -> Arc<WakeUpSignal> {
        Arc::clone(&self.wake_up)
    }

    async fn tick_root(&mut self, opt: TickOption, sleep_time: Duration) -> NodeResult {
        let mut status = NodeStatus::Idle;

        while status == NodeStatus::Idle
            || (matches!(opt, TickOption::WhileRunning) && status == NodeStatus::Running)
        {
            status = self.root.execute_tick().await?;

            // Consume a pending wake-up without sleeping: a node signalled
            // that a re-tick is worthwhile right now
            while !matches!(opt, TickOption::ExactlyOnce)
                && status == NodeStatus::Running
                && self.wake_up.wait_for(Duration::ZERO).await
            {
                status = self.root.execute_tick().await?;
            }

            if status.is_completed() {
                debug!("tree finished with status {status}");
                self.root.reset_status();
            }

            if matches!(opt, TickOption::WhileRunning) && status == NodeStatus::Running {
                self.wake_up.wait_for(sleep_time).await;
            }
        }

        Ok(status)
    }

    /// Tick the root once; the root's stored status is reset when the tick
    /// completed the tree.
    pub async fn tick_exactly_once(&mut self) -> NodeResult {
        self.tick_root(TickOption::ExactlyOnce, Duration::ZERO).await
    }

    /// Tick the root once, then keep re-ticking as long as the result is
    /// `Running` and the wake-up signal was raised in the meantime.
    pub async fn tick_once(&mut self) -> NodeResult {
        self.tick_root(TickOption::OnceUnlessWokenUp, Duration::ZERO)
            .await
    }

    /// Drive the tree to a terminal outcome, sleeping up to `sleep_time`
    /// between ticks. The sleep is cut short by the wake-up signal.
    pub async fn tick_while_running(&mut self, sleep_time: Duration) -> NodeResult {
        self.tick_root(TickOption::WhileRunning, sleep_time).await
    }

    /// Halt the root and reset every node in the tree to `Idle`.
    pub async fn halt_tree(&mut self) {
        self.root.halt().await;

        fn reset_recursively(node: &mut TreeNode) {
            node.reset_status();
            for child in node.data.children.iter_mut() {
                reset_recursively(child);
            }
        }
        reset_recursively(&mut self.root);
    }

    /// Visit every node in the tree, depth first.
    pub fn for_each_node_mut(&mut self, visitor: &mut dyn FnMut(&mut TreeNode)) {
        fn visit(node: &mut TreeNode, visitor: &mut dyn FnMut(&mut TreeNode)) {
            visitor(node);
            for child in node.data.children.iter_mut() {
                visit(child, visitor);
            }
        }
        visit(&mut self.root, visitor);
    }

    /// Install a status observer on every node of the tree.
    pub fn subscribe_status_changes(&mut self, observer: StatusObserver) {
        self.for_each_node_mut(&mut |node| {
            node.add_status_observer(Arc::clone(&observer));
        });
    }

    /// Serialize every subtree blackboard:
    /// `{ instance_name: { key: value } }`.
    pub fn export_to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for subtree in &self.subtrees {
            out.insert(
                subtree.instance_name.clone(),
                serde_json::Value::Object(subtree.blackboard.to_json()),
            );
        }
        serde_json::Value::Object(out)
    }

    /// Restore blackboard entries from [`Tree::export_to_json`] output.
    /// Sizes must match the current tree.
    pub fn import_from_json(&mut self, snapshot: &serde_json::Value) -> Result<(), SnapshotError> {
        let object = snapshot.as_object().ok_or(SnapshotError::NotAnObject)?;

        if object.len() != self.subtrees.len() {
            return Err(SnapshotError::SizeMismatch {
                expected: object.len(),
                actual: self.subtrees.len(),
            });
        }

        for (instance_name, values) in object {
            let subtree = self
                .subtrees
                .iter_mut()
                .find(|subtree| &subtree.instance_name == instance_name)
                .ok_or_else(|| SnapshotError::UnknownSubtree(instance_name.clone()))?;
            if let Some(values) = values.as_object() {
                subtree.blackboard.import_json(values)?;
            }
        }

        Ok(())
    }

    /// Snapshot the values of every subtree blackboard.
    pub fn blackboard_backup(&self) -> Vec<Blackboard> {
        self.subtrees
            .iter()
            .map(|subtree| {
                let mut copy = Blackboard::create();
                subtree.blackboard.clone_into(&mut copy);
                copy
            })
            .collect()
    }

    /// Restore a snapshot taken with [`Tree::blackboard_backup`]. Values
    /// only: remappings and parent links of the live blackboards stay as
    /// they are.
    pub fn blackboard_restore(&mut self, backup: &[Blackboard]) -> Result<(), SnapshotError> {
        if backup.len() != self.subtrees.len() {
            return Err(SnapshotError::SizeMismatch {
                expected: backup.len(),
                actual: self.subtrees.len(),
            });
        }

        for (saved, subtree) in backup.iter().zip(self.subtrees.iter_mut()) {
            saved.clone_into(&mut subtree.blackboard);
        }

        Ok(())
    }
}
