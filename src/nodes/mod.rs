use std::{collections::HashMap, fmt, sync::Arc, time::Duration, time::Instant};

use futures::future::BoxFuture;
use log::{debug, warn};
use thiserror::Error;

use crate::{
    any::CastError,
    basic_types::{
        get_remapped_key, FromString, NodeKind, PortDirection, PortsRemapping, TreeNodeManifest,
    },
    blackboard::{monotonic_stamp, BlackboardError, BlackboardString, LockedAny},
    scripting::{Environment, EnumsTablePtr, Script, ScriptError},
    wake_up::WakeUpSignal,
    Blackboard,
};

pub use crate::basic_types::{NodeStatus, PortsList};

pub mod action;
pub mod control;
pub mod decorator;

pub type NodeResult<Output = NodeStatus> = Result<Output, NodeError>;

/// Runtime dispatch category of a node. More fine grained than
/// [`NodeKind`]: actions split into the synchronous and the stateful
/// (start/running/halted) execution models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Control,
    Decorator,
    Condition,
    SyncAction,
    StatefulAction,
}

impl NodeType {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Control => NodeKind::Control,
            Self::Decorator => NodeKind::Decorator,
            Self::Condition => NodeKind::Condition,
            Self::SyncAction | Self::StatefulAction => NodeKind::Action,
        }
    }
}

// =============================
// Enum Definitions
// =============================

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node [{0}] returned invalid status [{1}]")]
    StatusError(String, String),
    #[error("out of bounds index")]
    IndexError,
    #[error("couldn't find port [{0}]")]
    PortError(String),
    #[error("couldn't parse port [{0}] value into specified type [{1}]")]
    PortValueParseError(String, String),
    #[error("output port [{0}] must point to the blackboard, e.g. {{key}}")]
    OutputPortError(String),
    #[error(transparent)]
    BlackboardError(#[from] BlackboardError),
    #[error(transparent)]
    ScriptError(#[from] ScriptError),
    #[error(transparent)]
    CastError(#[from] CastError),
    #[error("{0}")]
    NodeStructureError(String),
    #[error("decorator node does not have a child")]
    ChildMissing,
    #[error("worker thread failed: {0}")]
    WorkerError(String),
    #[error("{0}")]
    UserError(#[from] anyhow::Error),
    #[error("missing manifest on node [{0}]; this shouldn't happen, please report it")]
    MissingManifest(String),
}

/// Pre-conditions, evaluated in this declaration order by the tick
/// pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreCond {
    FailureIf,
    SuccessIf,
    SkipIf,
    WhileTrue,
}

impl PreCond {
    pub const EVALUATION_ORDER: [PreCond; 4] = [
        PreCond::FailureIf,
        PreCond::SuccessIf,
        PreCond::SkipIf,
        PreCond::WhileTrue,
    ];

    /// The reserved attribute that declares this condition.
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::FailureIf => "_failureIf",
            Self::SuccessIf => "_successIf",
            Self::SkipIf => "_skipIf",
            Self::WhileTrue => "_while",
        }
    }

    pub fn from_attribute(name: &str) -> Option<PreCond> {
        Self::EVALUATION_ORDER
            .iter()
            .copied()
            .find(|cond| cond.attribute() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostCond {
    OnHalted,
    OnFailure,
    OnSuccess,
    Always,
}

impl PostCond {
    pub const ALL: [PostCond; 4] = [
        PostCond::OnHalted,
        PostCond::OnFailure,
        PostCond::OnSuccess,
        PostCond::Always,
    ];

    pub fn attribute(&self) -> &'static str {
        match self {
            Self::OnHalted => "_onHalted",
            Self::OnFailure => "_onFailure",
            Self::OnSuccess => "_onSuccess",
            Self::Always => "_post",
        }
    }

    pub fn from_attribute(name: &str) -> Option<PostCond> {
        Self::ALL
            .iter()
            .copied()
            .find(|cond| cond.attribute() == name)
    }
}

// =========================================
// Struct Definitions and Implementations
// =========================================

/// Contains all common configuration that all types of nodes use.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub blackboard: Blackboard,
    pub enums: EnumsTablePtr,
    pub input_ports: PortsRemapping,
    pub output_ports: PortsRemapping,
    pub manifest: Option<Arc<TreeNodeManifest>>,
    pub uid: u16,
    pub path: String,
    pub pre_conditions: HashMap<PreCond, Script>,
    pub post_conditions: HashMap<PostCond, Script>,
    pub(crate) wake_up: Option<Arc<WakeUpSignal>>,
}

impl NodeConfig {
    pub fn new(blackboard: Blackboard) -> NodeConfig {
        Self {
            blackboard,
            enums: crate::scripting::new_enums_table(),
            input_ports: HashMap::new(),
            output_ports: HashMap::new(),
            manifest: None,
            uid: 0,
            path: String::new(),
            pre_conditions: HashMap::new(),
            post_conditions: HashMap::new(),
            wake_up: None,
        }
    }

    /// Returns a reference to the blackboard.
    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Adds a port to the config based on the direction. `InOut` ports land
    /// in both tables.
    pub fn add_port(&mut self, direction: PortDirection, name: String, value: String) {
        match direction {
            PortDirection::Input => {
                self.input_ports.insert(name, value);
            }
            PortDirection::Output => {
                self.output_ports.insert(name, value);
            }
            PortDirection::InOut => {
                self.input_ports.insert(name.clone(), value.clone());
                self.output_ports.insert(name, value);
            }
        };
    }

    pub fn has_port(&self, direction: &PortDirection, name: &str) -> bool {
        match direction {
            PortDirection::Input => self.input_ports.contains_key(name),
            PortDirection::Output => self.output_ports.contains_key(name),
            PortDirection::InOut => {
                self.input_ports.contains_key(name) || self.output_ports.contains_key(name)
            }
        }
    }

    /// Returns a pointer to the `TreeNodeManifest` for this node.
    pub fn manifest(&self) -> Result<Arc<TreeNodeManifest>, NodeError> {
        match self.manifest.as_ref() {
            Some(manifest) => Ok(Arc::clone(manifest)),
            None => Err(NodeError::MissingManifest(self.path.clone())),
        }
    }

    /// Replace the inner manifest.
    pub fn set_manifest(&mut self, manifest: Arc<TreeNodeManifest>) {
        let _ = self.manifest.insert(manifest);
    }

    /// The raw string assigned to the port, before any resolution.
    pub fn raw_input(&self, port: &str) -> Option<&str> {
        self.input_ports.get(port).map(String::as_str)
    }

    /// Returns the value of the input port at the `port` key.
    ///
    /// The raw port value resolves in this order:
    /// - a blackboard pointer (`"{foo}"`, or `"{=}"` for the port's own
    ///   name) dereferences through remappings;
    /// - a literal string parses with `T::from_string` (consumed verbatim
    ///   when `T` is `String`);
    /// - an unset port falls back to the manifest default, typed default
    ///   first.
    pub fn get_input<T>(&mut self, port: &str) -> Result<T, NodeError>
    where
        T: Clone + Send + Sync + FromString + 'static,
    {
        let raw = self.input_ports.get(port).cloned();
        match raw {
            Some(val) if !val.is_empty() => {
                match get_remapped_key(port, &val) {
                    // Value is a Blackboard pointer
                    Some(key) => Ok(self.blackboard.get::<T>(&key)?),
                    // Value is just a normal string
                    None => match <T as FromString>::from_string(&val) {
                        Ok(val) => Ok(val),
                        Err(_) => Err(NodeError::PortValueParseError(
                            String::from(port),
                            std::any::type_name::<T>().to_string(),
                        )),
                    },
                }
            }
            Some(_) | None => {
                // Unset or empty: fall back to the manifest default
                let manifest = self.manifest()?;
                let port_info = manifest
                    .ports
                    .get(port)
                    .ok_or_else(|| NodeError::PortError(String::from(port)))?;
                if let Some(default) = port_info.default_value() {
                    return Ok(default.try_cast::<T>()?);
                }
                match port_info.default_value_str() {
                    Some(default) => match <T as FromString>::from_string(&default) {
                        Ok(value) => Ok(value),
                        Err(_) => Err(NodeError::PortError(String::from(port))),
                    },
                    None => Err(NodeError::PortError(String::from(port))),
                }
            }
        }
    }

    /// Sets `value` into the blackboard. The key is named by the pointer
    /// assigned to the output port: `"{foo}"` writes `"foo"`, `"{=}"` (or
    /// `"="`) writes under the port's own name. A literal port value is an
    /// error.
    pub fn set_output<T>(&mut self, port: &str, value: T) -> Result<(), NodeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let raw = self.output_ports.get(port).cloned();
        match raw {
            Some(port_value) => {
                let blackboard_key = match port_value.as_str() {
                    "=" | "{=}" => port.to_string(),
                    value => match value.strip_bb_pointer() {
                        Some(key) => key,
                        None => return Err(NodeError::OutputPortError(port.to_string())),
                    },
                };

                self.blackboard.set(blackboard_key, value)?;

                Ok(())
            }
            None => Err(NodeError::PortError(port.to_string())),
        }
    }

    /// Scoped lock over the blackboard entry an input/output port points
    /// to, for atomic read-modify-write.
    pub fn get_locked_port_content(&mut self, port: &str) -> Option<LockedAny> {
        let raw = self
            .input_ports
            .get(port)
            .or_else(|| self.output_ports.get(port))?
            .clone();
        let key = get_remapped_key(port, raw)?;
        self.blackboard.get_any_locked(&key)
    }

    /// Environment for the scripts attached to this node.
    pub fn script_env(&self) -> Environment {
        Environment {
            blackboard: self.blackboard.clone(),
            enums: Arc::clone(&self.enums),
        }
    }

    /// Wake the tree driver from its sleep between ticks.
    pub fn emit_wake_up_signal(&self) {
        if let Some(wake_up) = &self.wake_up {
            wake_up.emit_signal();
        }
    }

    pub(crate) fn wake_up(&self) -> Option<Arc<WakeUpSignal>> {
        self.wake_up.clone()
    }
}

// =============================
// Callbacks and observers
// =============================

/// Observer invoked on every real status transition.
pub type StatusObserver =
    Arc<dyn Fn(Duration, &NodeData, NodeStatus, NodeStatus) + Send + Sync>;

/// Injected before `tick()`; a completed return value substitutes the tick.
pub type PreTickHook = Arc<dyn Fn(&mut NodeData) -> NodeResult + Send + Sync>;

/// Injected after `tick()`; a completed return value overrides the result.
pub type PostTickHook = Arc<dyn Fn(&mut NodeData, NodeStatus) -> NodeResult + Send + Sync>;

/// Receives the result and duration of every actual `tick()`.
pub type TickMonitorHook = Arc<dyn Fn(&NodeData, NodeStatus, Duration) + Send + Sync>;

/// The per-instance state every node carries: identity, configuration,
/// status and children. Behaviors receive it mutably on every tick.
pub struct NodeData {
    pub name: String,
    pub registration_id: String,
    pub node_type: NodeType,
    pub kind: NodeKind,
    pub config: NodeConfig,
    pub status: NodeStatus,
    /// Vector of child nodes
    pub children: Vec<TreeNode>,
    pub(crate) observers: Vec<StatusObserver>,
    pub(crate) pre_tick_hook: Option<PreTickHook>,
    pub(crate) post_tick_hook: Option<PostTickHook>,
    pub(crate) tick_monitor: Option<TickMonitorHook>,
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeData")
            .field("name", &self.name)
            .field("registration_id", &self.registration_id)
            .field("node_type", &self.node_type)
            .field("status", &self.status)
            .field("children", &self.children)
            .finish()
    }
}

impl NodeData {
    pub fn new(
        name: impl AsRef<str>,
        registration_id: impl AsRef<str>,
        node_type: NodeType,
        config: NodeConfig,
    ) -> NodeData {
        Self {
            name: name.as_ref().to_string(),
            registration_id: registration_id.as_ref().to_string(),
            node_type,
            kind: node_type.kind(),
            config,
            status: NodeStatus::Idle,
            children: Vec::new(),
            observers: Vec::new(),
            pre_tick_hook: None,
            post_tick_hook: None,
            tick_monitor: None,
        }
    }

    /// Sets the status of this node, notifying observers on a real
    /// transition.
    pub fn set_status(&mut self, status: NodeStatus) {
        let prev_status = self.status;
        self.status = status;

        if prev_status != status {
            let observers = self.observers.clone();
            let timestamp = monotonic_stamp();
            for observer in observers {
                observer(timestamp, self, prev_status, status);
            }
        }
    }

    /// Resets the status back to `NodeStatus::Idle`
    pub fn reset_status(&mut self) {
        self.set_status(NodeStatus::Idle);
    }

    /// Halt children from this index to the end.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::IndexError` if `start` is out of bounds.
    pub async fn halt_children(&mut self, start: usize) -> NodeResult<()> {
        if start >= self.children.len() {
            return Err(NodeError::IndexError);
        }

        let end = self.children.len();

        for i in start..end {
            self.halt_child_idx(i).await?;
        }

        Ok(())
    }

    /// Halts and resets all children
    pub async fn reset_children(&mut self) {
        for i in 0..self.children.len() {
            // In range by construction
            let _ = self.halt_child_idx(i).await;
        }
    }

    /// Halt child at the `index`. Not to be confused with `halt_child()`, which is
    /// a helper that calls `halt_child_idx(0)`, primarily used for `Decorator` nodes.
    pub async fn halt_child_idx(&mut self, index: usize) -> NodeResult<()> {
        let child = self.children.get_mut(index).ok_or(NodeError::IndexError)?;
        if child.status() == NodeStatus::Running {
            child.halt().await;
        }
        child.reset_status();
        Ok(())
    }

    /// Calls `halt_child_idx(0)`. This should only be used in
    /// `Decorator` nodes
    pub async fn halt_child(&mut self) {
        self.reset_child().await
    }

    /// Halts and resets the first child. This should only be used in
    /// `Decorator` nodes
    pub async fn reset_child(&mut self) {
        if let Some(child) = self.children.get_mut(0) {
            if matches!(child.status(), NodeStatus::Running) {
                child.halt().await;
            }

            child.reset_status();
        }
    }

    /// Gets a mutable reference to the first child. Helper for
    /// `Decorator` nodes to get their child.
    pub fn child(&mut self) -> Option<&mut TreeNode> {
        self.children.get_mut(0)
    }
}

// =============================
// The behavior trait
// =============================

/// The logic of a node kind. The shared `execute_tick` pipeline lives on
/// [`TreeNode`]; implementations only provide `tick` (plus `start` for
/// stateful actions) and `halt`.
pub trait NodeBehavior: Send {
    /// The node-specific tick. Composites dispatch to `node.children` here.
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult>;

    /// First tick of a stateful action. Defaults to `tick`.
    fn start<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        self.tick(node)
    }

    /// Interrupt the node. Must be idempotent. Composites halt and reset
    /// their children here.
    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let _ = node;
        })
    }
}

/// A node instance: shared data plus its behavior.
pub struct TreeNode {
    pub data: NodeData,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("name", &self.data.name)
            .field("registration_id", &self.data.registration_id)
            .field("status", &self.data.status)
            .field("children", &self.data.children)
            .finish()
    }
}

impl TreeNode {
    pub fn new(data: NodeData, behavior: Box<dyn NodeBehavior>) -> TreeNode {
        Self { data, behavior }
    }

    /// Returns the current node's status
    pub fn status(&self) -> NodeStatus {
        self.data.status
    }

    /// Resets the status back to `NodeStatus::Idle`
    pub fn reset_status(&mut self) {
        self.data.reset_status();
    }

    /// Get the name of the node
    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn registration_id(&self) -> &str {
        &self.data.registration_id
    }

    /// Get a mutable reference to the `NodeConfig`
    pub fn config_mut(&mut self) -> &mut NodeConfig {
        &mut self.data.config
    }

    /// Get a reference to the `NodeConfig`
    pub fn config(&self) -> &NodeConfig {
        &self.data.config
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind
    }

    pub fn uid(&self) -> u16 {
        self.data.config.uid
    }

    pub fn path(&self) -> &str {
        &self.data.config.path
    }

    /// Return an iterator over the children. Returns `None` if this node
    /// has no children (i.e. an `Action` node)
    pub fn children(&self) -> Option<impl Iterator<Item = &TreeNode>> {
        if self.data.children.is_empty() {
            None
        } else {
            Some(self.data.children.iter())
        }
    }

    /// Return a mutable iterator over the children. Returns `None` if this node
    /// has no children (i.e. an `Action` node)
    pub fn children_mut(&mut self) -> Option<impl Iterator<Item = &mut TreeNode>> {
        if self.data.children.is_empty() {
            None
        } else {
            Some(self.data.children.iter_mut())
        }
    }

    /// Subscribe to status transitions of this node.
    pub fn add_status_observer(&mut self, observer: StatusObserver) {
        self.data.observers.push(observer);
    }

    pub fn set_pre_tick_hook(&mut self, hook: PreTickHook) {
        self.data.pre_tick_hook = Some(hook);
    }

    pub fn set_post_tick_hook(&mut self, hook: PostTickHook) {
        self.data.post_tick_hook = Some(hook);
    }

    pub fn set_tick_monitor(&mut self, hook: TickMonitorHook) {
        self.data.tick_monitor = Some(hook);
    }

    /// Override existing port remappings. Meant for adjustments between
    /// instantiation and the first tick; ports not already declared on the
    /// node are ignored.
    pub fn modify_ports_remapping(&mut self, remapping: &PortsRemapping) {
        for (name, value) in remapping {
            if let Some(slot) = self.data.config.input_ports.get_mut(name) {
                *slot = value.clone();
            }
            if let Some(slot) = self.data.config.output_ports.get_mut(name) {
                *slot = value.clone();
            }
        }
    }

    /// Tick the node through the full pipeline: pre-conditions, injected
    /// pre-tick hook, the actual tick, post-conditions, injected post-tick
    /// hook, then status storage and observer notification. A `Skipped`
    /// result is reported to the parent but never stored.
    pub fn execute_tick(&mut self) -> BoxFuture<'_, NodeResult> {
        Box::pin(async move {
            let pre_hook = self.data.pre_tick_hook.clone();
            let post_hook = self.data.post_tick_hook.clone();
            let monitor = self.data.tick_monitor.clone();

            let mut new_status;

            // A pre-condition may produce the status without ticking
            match self.check_pre_conditions().await? {
                Some(status) => new_status = status,
                None => {
                    let mut substituted = false;
                    new_status = self.data.status;

                    if let Some(hook) = pre_hook {
                        if !self.data.status.is_completed() {
                            let hook_status = hook(&mut self.data)?;
                            if hook_status.is_completed() {
                                substituted = true;
                                new_status = hook_status;
                            }
                        }
                    }

                    // Call the ACTUAL tick
                    if !substituted {
                        let begin = Instant::now();
                        new_status = self.dispatch_tick().await?;
                        if let Some(monitor) = monitor {
                            monitor(&self.data, new_status, begin.elapsed());
                        }
                    }
                }
            }

            if new_status.is_completed() {
                self.run_post_conditions(new_status);
            }

            if let Some(hook) = post_hook {
                let hook_status = hook(&mut self.data, new_status)?;
                if hook_status.is_completed() {
                    new_status = hook_status;
                }
            }

            // Preserve IDLE if skipped, but communicate SKIPPED to the parent
            if new_status != NodeStatus::Skipped {
                self.data.set_status(new_status);
            }

            Ok(new_status)
        })
    }

    async fn dispatch_tick(&mut self) -> NodeResult {
        let Self { data, behavior } = self;

        match data.node_type {
            NodeType::Control | NodeType::Decorator => behavior.tick(data).await,
            NodeType::Condition | NodeType::SyncAction => {
                match behavior.tick(data).await? {
                    status @ (NodeStatus::Running | NodeStatus::Idle) => Err(
                        NodeError::StatusError(data.config.path.clone(), status.to_string()),
                    ),
                    status => Ok(status),
                }
            }
            NodeType::StatefulAction => {
                let prev_status = data.status;

                match prev_status {
                    NodeStatus::Idle => {
                        debug!("{}::on_start()", data.config.path);
                        let new_status = behavior.start(data).await?;
                        if matches!(new_status, NodeStatus::Idle) {
                            return Err(NodeError::StatusError(
                                format!("{}::on_start()", data.config.path),
                                "Idle".to_string(),
                            ));
                        }
                        Ok(new_status)
                    }
                    NodeStatus::Running => {
                        debug!("{}::on_running()", data.config.path);
                        let new_status = behavior.tick(data).await?;
                        if matches!(new_status, NodeStatus::Idle) {
                            return Err(NodeError::StatusError(
                                format!("{}::on_running()", data.config.path),
                                "Idle".to_string(),
                            ));
                        }
                        Ok(new_status)
                    }
                    prev_status => Ok(prev_status),
                }
            }
        }
    }

    /// Evaluate the pre-conditions in declaration order. `Some(status)`
    /// short-circuits the tick.
    async fn check_pre_conditions(&mut self) -> NodeResult<Option<NodeStatus>> {
        if self.data.config.pre_conditions.is_empty() {
            return Ok(None);
        }

        let mut env = self.data.config.script_env();

        for cond in PreCond::EVALUATION_ORDER {
            let Some(script) = self.data.config.pre_conditions.get(&cond) else {
                continue;
            };
            let script = script.clone();

            match self.data.status {
                NodeStatus::Idle | NodeStatus::Skipped => {
                    if script.run_condition(&mut env)? {
                        match cond {
                            PreCond::FailureIf => return Ok(Some(NodeStatus::Failure)),
                            PreCond::SuccessIf => return Ok(Some(NodeStatus::Success)),
                            PreCond::SkipIf => return Ok(Some(NodeStatus::Skipped)),
                            PreCond::WhileTrue => {}
                        }
                    } else if cond == PreCond::WhileTrue {
                        return Ok(Some(NodeStatus::Skipped));
                    }
                }
                NodeStatus::Running if cond == PreCond::WhileTrue => {
                    if !script.run_condition(&mut env)? {
                        self.halt().await;
                        return Ok(Some(NodeStatus::Skipped));
                    }
                }
                _ => {}
            }
        }

        Ok(None)
    }

    fn run_post_conditions(&mut self, status: NodeStatus) {
        let conditions = &self.data.config.post_conditions;
        let mut scripts = Vec::new();

        match status {
            NodeStatus::Success => scripts.extend(conditions.get(&PostCond::OnSuccess).cloned()),
            NodeStatus::Failure => scripts.extend(conditions.get(&PostCond::OnFailure).cloned()),
            _ => {}
        }
        scripts.extend(conditions.get(&PostCond::Always).cloned());

        let mut env = self.data.config.script_env();
        for script in scripts {
            if let Err(err) = script.run(&mut env) {
                warn!(
                    "post-condition [{}] of node [{}] failed: {err}",
                    script.source(),
                    self.data.config.path
                );
            }
        }
    }

    /// Synchronously interrupt the node. Idempotent; afterwards the status
    /// is `Idle`. Runs the `_onHalted` script when one is attached.
    pub fn halt(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Self { data, behavior } = self;
            behavior.halt(data).await;

            if let Some(script) = data.config.post_conditions.get(&PostCond::OnHalted) {
                let script = script.clone();
                let mut env = data.config.script_env();
                if let Err(err) = script.run(&mut env) {
                    warn!(
                        "_onHalted script of node [{}] failed: {err}",
                        data.config.path
                    );
                }
            }

            data.reset_status();
        })
    }
}
