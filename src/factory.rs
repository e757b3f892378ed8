use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::debug;
use thiserror::Error;

use crate::{
    basic_types::{
        FromString, NodeKind, PortChecks, PortsList, TreeNodeManifest,
    },
    blackboard::{Blackboard, BlackboardError, BlackboardString},
    macros::{define_ports, input_port, output_port},
    model::{NodeModel, TreeModel},
    nodes::{
        action::{
            AlwaysFailure, AlwaysSuccess, ScriptCondition, ScriptNode, SetBlackboard,
            SimpleAction, SimpleActionFn, SimpleCondition, SleepNode, TestNode, TestNodeConfig,
            UnsetBlackboard, WasEntryUpdated,
        },
        control::{
            FallbackNode, IfThenElseNode, ParallelAllNode, ParallelNode, ReactiveFallbackNode,
            ReactiveSequenceNode, SequenceNode, SequenceWithMemoryNode, SwitchNode,
            WhileDoElseNode,
        },
        decorator::{
            DelayNode, EntryUpdatedNode, ForceFailureNode, ForceSuccessNode, InverterNode,
            KeepRunningUntilFailureNode, LoopNode, PreconditionNode, RepeatNode, RetryNode,
            RunOnceNode, SubtreeNode, TimeoutNode,
        },
        NodeBehavior, NodeConfig, NodeData, NodeResult, NodeStatus, PostCond, PreCond, TreeNode,
    },
    scripting::{new_enums_table, EnumsTablePtr, Script, ScriptError},
    tree::{Subtree, Tree},
    wake_up::WakeUpSignal,
    xml::{self, XmlParseError},
};

/// Programmer and model contract violations, detected at registration or
/// instantiation time. These never occur during a well-formed tick.
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("a node with ID [{0}] is already registered")]
    DuplicateId(String),
    #[error("node ID [{0}] is not registered")]
    UnknownNode(String),
    #[error("substituted node ID [{0}] not found")]
    UnknownSubstitution(String),
    #[error("can't find tree [{0}]")]
    UnknownTree(String),
    #[error("a tree with ID [{0}] was already registered")]
    DuplicateTree(String),
    #[error("the ID [{0}] is builtin and cannot be unregistered")]
    BuiltinNode(String),
    #[error("port name [{0}] did not match node [{1}] port list: {2:?}")]
    InvalidPort(String, String, Vec<String>),
    #[error("port name [{0}] is reserved or malformed")]
    InvalidPortName(String),
    #[error("attribute [{0}] uses a reserved prefix and is not understood")]
    ReservedAttribute(String),
    #[error("invalid value [{1}] for attribute [{0}]")]
    InvalidAttribute(String, String),
    #[error("missing attribute: {0}")]
    MissingAttribute(String),
    #[error("node [{id}] of kind {kind} {expected}, has {actual} children")]
    ChildCountMismatch {
        id: String,
        kind: NodeKind,
        expected: String,
        actual: usize,
    },
    #[error("error in the script [{source_text}]: {source}")]
    ScriptParse {
        source_text: String,
        #[source]
        source: ScriptError,
    },
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("scripting enum [{0}] is already registered with a different value")]
    EnumConflict(String),
    #[error("no main tree was provided, either in the model or as an argument")]
    NoMainTree,
    #[error(transparent)]
    Xml(#[from] XmlParseError),
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
    #[error("invalid substitution rules JSON: {0}")]
    SubstitutionJson(String),
}

pub use crate::nodes::NodeType;

/// Builds the behavior of one node instance. The configuration is already
/// assembled when the builder runs, so behaviors may inspect their ports.
pub type NodeBuilder =
    Arc<dyn Fn(&NodeConfig) -> Result<Box<dyn NodeBehavior>, LogicError> + Send + Sync>;

/// Static description of registerable node types, used by
/// [`Factory::register_node_type`].
pub trait NodeStatic {
    fn node_type() -> NodeType;

    fn provided_ports() -> PortsList {
        PortsList::new()
    }
}

/// Instantiation-time override: replace matched nodes with another
/// registered kind, or with a configured [`TestNode`] stub.
#[derive(Clone)]
pub enum SubstitutionRule {
    ReplaceWithId(String),
    TestNode(TestNodeConfig),
}

impl From<&str> for SubstitutionRule {
    fn from(id: &str) -> Self {
        Self::ReplaceWithId(id.to_string())
    }
}

impl From<String> for SubstitutionRule {
    fn from(id: String) -> Self {
        Self::ReplaceWithId(id)
    }
}

impl From<TestNodeConfig> for SubstitutionRule {
    fn from(config: TestNodeConfig) -> Self {
        Self::TestNode(config)
    }
}

/// `*` and `?` glob match, used by substitution filters against node
/// names, registration ids and full paths.
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    fn matches(text: &[char], pattern: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some('*'), _) => {
                matches(text, &pattern[1..])
                    || (!text.is_empty() && matches(&text[1..], pattern))
            }
            (Some('?'), Some(_)) => matches(&text[1..], &pattern[1..]),
            (Some(p), Some(t)) => p == t && matches(&text[1..], &pattern[1..]),
            (Some(_), None) => false,
        }
    }

    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&text, &pattern)
}

struct Registration {
    manifest: Arc<TreeNodeManifest>,
    node_type: NodeType,
    builder: NodeBuilder,
}

/// Registry of node kinds and tree models, and the entry point that turns a
/// model into an executable [`Tree`].
pub struct Factory {
    registry: HashMap<String, Registration>,
    builtin_ids: HashSet<String>,
    models: HashMap<String, TreeModel>,
    main_tree_id: Option<String>,
    substitution_rules: Vec<(String, SubstitutionRule)>,
    enums: EnumsTablePtr,
}

impl Factory {
    pub fn new() -> Factory {
        let mut factory = Self {
            registry: HashMap::new(),
            builtin_ids: HashSet::new(),
            models: HashMap::new(),
            main_tree_id: None,
            substitution_rules: Vec::new(),
            enums: new_enums_table(),
        };

        register_builtin_nodes(&mut factory);
        factory.builtin_ids = factory.registry.keys().cloned().collect();
        factory
    }

    // =========================
    // Node registration
    // =========================

    /// Register a node behavior under `id` with an explicit builder.
    pub fn register_builder(
        &mut self,
        id: impl AsRef<str>,
        kind: NodeKind,
        node_type: NodeType,
        ports: PortsList,
        builder: NodeBuilder,
    ) -> Result<(), LogicError> {
        let id = id.as_ref();

        for port_name in ports.keys() {
            if !port_name.is_allowed_port_name() {
                return Err(LogicError::InvalidPortName(port_name.clone()));
            }
        }
        if self.registry.contains_key(id) {
            return Err(LogicError::DuplicateId(id.to_string()));
        }

        self.registry.insert(
            id.to_string(),
            Registration {
                manifest: Arc::new(TreeNodeManifest::new(kind, id, ports, "")),
                node_type,
                builder,
            },
        );
        Ok(())
    }

    /// Register a behavior type constructible with `Default`.
    pub fn register_node_type<T>(&mut self, id: impl AsRef<str>) -> Result<(), LogicError>
    where
        T: NodeBehavior + NodeStatic + Default + 'static,
    {
        self.register_builder(
            id,
            T::node_type().kind(),
            T::node_type(),
            T::provided_ports(),
            Arc::new(|_config| Ok(Box::new(T::default()))),
        )
    }

    /// Register a synchronous action from a closure.
    pub fn register_simple_action(
        &mut self,
        id: impl AsRef<str>,
        ports: PortsList,
        tick_fn: impl Fn(&mut NodeData) -> NodeResult + Send + Sync + 'static,
    ) -> Result<(), LogicError> {
        let tick_fn: SimpleActionFn = Arc::new(tick_fn);
        self.register_builder(
            id,
            NodeKind::Action,
            NodeType::SyncAction,
            ports,
            Arc::new(move |_config| Ok(Box::new(SimpleAction::from_shared(Arc::clone(&tick_fn))))),
        )
    }

    /// Register a condition from a closure returning `bool`.
    pub fn register_simple_condition(
        &mut self,
        id: impl AsRef<str>,
        ports: PortsList,
        check_fn: impl Fn(&mut NodeData) -> NodeResult<bool> + Send + Sync + 'static,
    ) -> Result<(), LogicError> {
        let check_fn: Arc<dyn Fn(&mut NodeData) -> NodeResult<bool> + Send + Sync> =
            Arc::new(check_fn);
        self.register_builder(
            id,
            NodeKind::Condition,
            NodeType::Condition,
            ports,
            Arc::new(move |_config| {
                Ok(Box::new(SimpleCondition::from_shared(Arc::clone(&check_fn))))
            }),
        )
    }

    /// Remove a registered node kind. Builtins are protected.
    pub fn unregister_node(&mut self, id: impl AsRef<str>) -> Result<(), LogicError> {
        let id = id.as_ref();
        if self.builtin_ids.contains(id) {
            return Err(LogicError::BuiltinNode(id.to_string()));
        }
        match self.registry.remove(id) {
            Some(_) => Ok(()),
            None => Err(LogicError::UnknownNode(id.to_string())),
        }
    }

    pub fn registered_node_ids(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    pub fn manifest(&self, id: impl AsRef<str>) -> Option<Arc<TreeNodeManifest>> {
        self.registry
            .get(id.as_ref())
            .map(|registration| Arc::clone(&registration.manifest))
    }

    /// Register the JSON representation of a custom port type; raw strings
    /// of the form `json:{...}` parse into `T` afterwards. The registry is
    /// process wide, as in [`crate::any::register_json_converter`].
    pub fn register_json_converter<T>(&mut self)
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        crate::any::register_json_converter::<T>();
    }

    // =========================
    // Scripting enums
    // =========================

    /// Register an identifier usable in scripts. Re-registration with a
    /// different value is an error.
    pub fn register_scripting_enum(
        &mut self,
        name: impl AsRef<str>,
        value: i64,
    ) -> Result<(), LogicError> {
        let name = name.as_ref();
        let mut enums = self.enums.lock().unwrap();
        match enums.get(name) {
            Some(existing) if *existing != value => {
                Err(LogicError::EnumConflict(name.to_string()))
            }
            _ => {
                enums.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    // =========================
    // Substitution rules
    // =========================

    /// First matching rule (in insertion order) wins. `filter` is a
    /// wildcard over the node name, registration id or full path.
    pub fn add_substitution_rule(
        &mut self,
        filter: impl AsRef<str>,
        rule: impl Into<SubstitutionRule>,
    ) {
        self.substitution_rules
            .push((filter.as_ref().to_string(), rule.into()));
    }

    pub fn clear_substitution_rules(&mut self) {
        self.substitution_rules.clear();
    }

    pub fn substitution_rules(&self) -> &[(String, SubstitutionRule)] {
        &self.substitution_rules
    }

    /// Load substitution rules from JSON, e.g.:
    ///
    /// ```json
    /// {
    ///   "TestNodeConfigs": {
    ///     "QuickFailure": { "return_status": "FAILURE", "async_delay": 10 }
    ///   },
    ///   "SubstitutionRules": {
    ///     "OpenDoor": "QuickFailure",
    ///     "nav/*": "AlwaysSuccess"
    ///   }
    /// }
    /// ```
    pub fn load_substitution_rules_from_json(&mut self, json: &str) -> Result<(), LogicError> {
        let parsed: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| LogicError::SubstitutionJson(err.to_string()))?;

        let mut test_configs: HashMap<String, TestNodeConfig> = HashMap::new();

        if let Some(configs) = parsed.get("TestNodeConfigs").and_then(|v| v.as_object()) {
            for (name, value) in configs {
                let mut config = TestNodeConfig::default();
                if let Some(status) = value.get("return_status").and_then(|v| v.as_str()) {
                    config.return_status = NodeStatus::from_string(status).map_err(|_| {
                        LogicError::SubstitutionJson(format!("bad return_status in [{name}]"))
                    })?;
                }
                if let Some(delay) = value.get("async_delay").and_then(|v| v.as_u64()) {
                    config.async_delay = std::time::Duration::from_millis(delay);
                }
                config.success_script = value
                    .get("success_script")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                config.failure_script = value
                    .get("failure_script")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                config.post_script = value
                    .get("post_script")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);

                test_configs.insert(name.clone(), config);
            }
        }

        if let Some(rules) = parsed.get("SubstitutionRules").and_then(|v| v.as_object()) {
            for (filter, rule) in rules {
                let target = rule.as_str().ok_or_else(|| {
                    LogicError::SubstitutionJson(format!("rule for [{filter}] must be a string"))
                })?;
                match test_configs.get(target) {
                    Some(config) => self.add_substitution_rule(filter, config.clone()),
                    None => self.add_substitution_rule(filter, target),
                }
            }
        }

        Ok(())
    }

    // =========================
    // Tree models
    // =========================

    /// Parse the XML text and register every tree it defines.
    pub fn register_behavior_tree_from_text(
        &mut self,
        xml: impl AsRef<str>,
    ) -> Result<(), LogicError> {
        let collection = xml::parse_tree_models(xml)?;

        if let Some(main_tree_id) = collection.main_tree_id {
            self.main_tree_id = Some(main_tree_id);
        }
        for tree in collection.trees {
            self.register_tree_model(tree)?;
        }
        Ok(())
    }

    /// As [`Factory::register_behavior_tree_from_text`], reading the XML
    /// from a file.
    pub fn register_behavior_tree_from_file(
        &mut self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), LogicError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            LogicError::Xml(XmlParseError::InternalError(format!(
                "can't read [{}]: {err}",
                path.as_ref().display()
            )))
        })?;
        self.register_behavior_tree_from_text(text)
    }

    /// Register a logical tree model directly, bypassing any text format.
    pub fn register_tree_model(&mut self, model: TreeModel) -> Result<(), LogicError> {
        if self.models.contains_key(&model.id) {
            return Err(LogicError::DuplicateTree(model.id));
        }
        self.models.insert(model.id.clone(), model);
        Ok(())
    }

    pub fn registered_behavior_trees(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    // =========================
    // Instantiation
    // =========================

    /// Register the trees in `text` and instantiate the main one.
    pub fn create_tree_from_text(&mut self, text: impl AsRef<str>) -> Result<Tree, LogicError> {
        self.register_behavior_tree_from_text(text)?;
        self.create_main_tree()
    }

    /// Instantiate the tree designated by `main_tree_to_execute`, or the
    /// only registered one.
    pub fn create_main_tree(&self) -> Result<Tree, LogicError> {
        if let Some(main_tree_id) = &self.main_tree_id {
            return self.create_tree(main_tree_id.clone());
        }
        if self.models.len() == 1 {
            // Only one by the check above
            let id = self.models.keys().next().unwrap().clone();
            return self.create_tree(id);
        }
        Err(LogicError::NoMainTree)
    }

    pub fn create_tree(&self, tree_id: impl AsRef<str>) -> Result<Tree, LogicError> {
        self.create_tree_with_blackboard(tree_id, Blackboard::create())
    }

    /// Instantiate `tree_id` against an externally created root blackboard.
    pub fn create_tree_with_blackboard(
        &self,
        tree_id: impl AsRef<str>,
        blackboard: Blackboard,
    ) -> Result<Tree, LogicError> {
        let tree_id = tree_id.as_ref();
        let wake_up = Arc::new(WakeUpSignal::new());

        let mut instantiator = Instantiator {
            factory: self,
            wake_up: Arc::clone(&wake_up),
            next_uid: 0,
            subtrees: Vec::new(),
        };

        let root = instantiator.instantiate_tree(tree_id, tree_id, "", blackboard)?;
        debug!(
            "instantiated tree [{tree_id}] with {} subtree(s)",
            instantiator.subtrees.len()
        );

        Ok(Tree::new(root, instantiator.subtrees, wake_up))
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

// =========================
// The instantiation walk
// =========================

struct Instantiator<'f> {
    factory: &'f Factory,
    wake_up: Arc<WakeUpSignal>,
    next_uid: u16,
    subtrees: Vec<Subtree>,
}

impl<'f> Instantiator<'f> {
    fn next_uid(&mut self) -> u16 {
        self.next_uid += 1;
        self.next_uid
    }

    fn instantiate_tree(
        &mut self,
        tree_id: &str,
        instance_name: &str,
        path_prefix: &str,
        blackboard: Blackboard,
    ) -> Result<TreeNode, LogicError> {
        let factory = self.factory;
        let model = factory
            .models
            .get(tree_id)
            .ok_or_else(|| LogicError::UnknownTree(tree_id.to_string()))?;

        self.subtrees.push(Subtree {
            tree_id: tree_id.to_string(),
            instance_name: instance_name.to_string(),
            blackboard: blackboard.clone(),
        });

        self.instantiate_node(&model.root, &blackboard, path_prefix)
    }

    fn instantiate_node(
        &mut self,
        model: &NodeModel,
        blackboard: &Blackboard,
        path_prefix: &str,
    ) -> Result<TreeNode, LogicError> {
        if model.registration_id == "SubTree" {
            return self.instantiate_subtree_node(model, blackboard, path_prefix);
        }

        let factory = self.factory;
        let registration = factory
            .registry
            .get(&model.registration_id)
            .ok_or_else(|| LogicError::UnknownNode(model.registration_id.clone()))?;

        let kind = registration.manifest.kind;
        validate_child_count(model, kind)?;

        let uid = self.next_uid();
        let instance_name = model
            .instance_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}::{uid}", model.registration_id));
        let path = format!("{path_prefix}{instance_name}");

        let mut config = NodeConfig::new(blackboard.clone());
        config.enums = Arc::clone(&factory.enums);
        config.uid = uid;
        config.path = path.clone();
        config.wake_up = Some(Arc::clone(&self.wake_up));
        config.set_manifest(Arc::clone(&registration.manifest));

        apply_attributes(&mut config, model, &registration.manifest)?;
        apply_port_defaults(&mut config, &registration.manifest);
        create_port_entries(&mut config, &registration.manifest)?;

        let mut children = Vec::new();
        let child_prefix = format!("{path}/");
        for child_model in &model.children {
            children.push(self.instantiate_node(child_model, blackboard, &child_prefix)?);
        }

        let (behavior, node_type) =
            self.resolve_behavior(model, &instance_name, &path, &config, registration)?;

        let mut data = NodeData::new(instance_name, &model.registration_id, node_type, config);
        data.kind = kind;
        data.children = children;

        Ok(TreeNode::new(data, behavior))
    }

    /// Apply the first matching substitution rule, or fall back to the
    /// registered builder.
    fn resolve_behavior(
        &self,
        model: &NodeModel,
        instance_name: &str,
        path: &str,
        config: &NodeConfig,
        registration: &Registration,
    ) -> Result<(Box<dyn NodeBehavior>, NodeType), LogicError> {
        let factory = self.factory;

        for (filter, rule) in &factory.substitution_rules {
            let matched = filter == instance_name
                || filter == &model.registration_id
                || wildcard_match(path, filter);
            if !matched {
                continue;
            }

            debug!("substituting node [{path}] via filter [{filter}]");
            return match rule {
                SubstitutionRule::ReplaceWithId(substituted_id) => {
                    let substituted = factory.registry.get(substituted_id).ok_or_else(|| {
                        LogicError::UnknownSubstitution(substituted_id.clone())
                    })?;
                    Ok(((substituted.builder)(config)?, substituted.node_type))
                }
                SubstitutionRule::TestNode(test_config) => Ok((
                    Box::new(TestNode::new(test_config.clone())?),
                    NodeType::StatefulAction,
                )),
            };
        }

        Ok(((registration.builder)(config)?, registration.node_type))
    }

    fn instantiate_subtree_node(
        &mut self,
        model: &NodeModel,
        blackboard: &Blackboard,
        path_prefix: &str,
    ) -> Result<TreeNode, LogicError> {
        let factory = self.factory;

        if !model.children.is_empty() {
            return Err(LogicError::ChildCountMismatch {
                id: "SubTree".to_string(),
                kind: NodeKind::SubTree,
                expected: "takes no model children; the nested root is synthesised".to_string(),
                actual: model.children.len(),
            });
        }

        let target_id = model
            .attributes
            .get("ID")
            .ok_or_else(|| LogicError::MissingAttribute("SubTree requires an ID".to_string()))?;

        let uid = self.next_uid();
        let instance_name = model
            .instance_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{target_id}::{uid}"));
        let path = format!("{path_prefix}{instance_name}");

        let mut config = NodeConfig::new(blackboard.clone());
        config.enums = Arc::clone(&factory.enums);
        config.uid = uid;
        config.path = path.clone();
        config.wake_up = Some(Arc::clone(&self.wake_up));
        if let Some(registration) = factory.registry.get("SubTree") {
            config.set_manifest(Arc::clone(&registration.manifest));
        }

        let mut child_blackboard = Blackboard::with_parent(blackboard);

        for (attr, value) in &model.attributes {
            if attr == "ID" || attr == "name" {
                continue;
            }
            if attr == "_autoremap" {
                let enabled = bool::from_string(value).map_err(|_| {
                    LogicError::InvalidAttribute(attr.clone(), value.clone())
                })?;
                child_blackboard.enable_auto_remapping(enabled);
                continue;
            }
            if let Some(cond) = PreCond::from_attribute(attr) {
                config
                    .pre_conditions
                    .insert(cond, parse_condition_script(value)?);
                continue;
            }
            if let Some(cond) = PostCond::from_attribute(attr) {
                config
                    .post_conditions
                    .insert(cond, parse_condition_script(value)?);
                continue;
            }
            if attr == "_uid" || attr == "_fullpath" {
                continue;
            }
            if attr.starts_with('_') {
                return Err(LogicError::ReservedAttribute(attr.clone()));
            }

            if value == "{=}" || value == "=" {
                child_blackboard.add_subtree_remapping(attr.clone(), attr.clone());
            } else if let Some(external) = value.strip_bb_pointer() {
                // Redirect the subtree's key to the parent's
                child_blackboard.add_subtree_remapping(attr.clone(), external);
            } else {
                // A literal value goes straight onto the child blackboard
                child_blackboard.set(attr, value.clone())?;
            }
        }

        let subtree_root =
            self.instantiate_tree(target_id, &path, &format!("{path}/"), child_blackboard)?;

        let mut data = NodeData::new(instance_name, "SubTree", NodeType::Decorator, config);
        data.kind = NodeKind::SubTree;
        data.children = vec![subtree_root];

        Ok(TreeNode::new(data, Box::new(SubtreeNode)))
    }
}

fn parse_condition_script(source: &str) -> Result<Script, LogicError> {
    Script::parse(source).map_err(|err| LogicError::ScriptParse {
        source_text: source.to_string(),
        source: err,
    })
}

fn validate_child_count(model: &NodeModel, kind: NodeKind) -> Result<(), LogicError> {
    let actual = model.children.len();
    let expected: Option<&str> = match kind {
        NodeKind::Control if actual == 0 => Some("needs at least one child"),
        NodeKind::Decorator if actual != 1 => Some("needs exactly one child"),
        NodeKind::Action | NodeKind::Condition if actual != 0 => Some("takes no children"),
        _ => None,
    };

    match expected {
        Some(expected) => Err(LogicError::ChildCountMismatch {
            id: model.registration_id.clone(),
            kind,
            expected: expected.to_string(),
            actual,
        }),
        None => Ok(()),
    }
}

/// Split the model attributes into pre/post-condition scripts and port
/// remappings, validating ports against the manifest.
fn apply_attributes(
    config: &mut NodeConfig,
    model: &NodeModel,
    manifest: &TreeNodeManifest,
) -> Result<(), LogicError> {
    for (attr, value) in &model.attributes {
        if attr == "name" || attr == "ID" {
            continue;
        }
        if let Some(cond) = PreCond::from_attribute(attr) {
            config
                .pre_conditions
                .insert(cond, parse_condition_script(value)?);
            continue;
        }
        if let Some(cond) = PostCond::from_attribute(attr) {
            config
                .post_conditions
                .insert(cond, parse_condition_script(value)?);
            continue;
        }
        // Editor-written metadata, nothing to wire
        if attr == "_uid" || attr == "_fullpath" {
            continue;
        }
        if attr.starts_with('_') {
            return Err(LogicError::ReservedAttribute(attr.clone()));
        }

        let port_info = manifest.ports.get(attr).ok_or_else(|| {
            LogicError::InvalidPort(
                attr.clone(),
                manifest.registration_id.clone(),
                manifest.ports.keys().cloned().collect(),
            )
        })?;
        config.add_port(*port_info.direction(), attr.clone(), value.clone());
    }

    Ok(())
}

/// Give unbound ports their manifest default (in raw string form, so
/// pointer defaults like `"{=}"` resolve normally).
fn apply_port_defaults(config: &mut NodeConfig, manifest: &TreeNodeManifest) {
    for (port_name, port_info) in manifest.ports.iter() {
        let direction = port_info.direction();

        if !config.has_port(direction, port_name) {
            if let Some(default) = port_info.default_value_str() {
                config.add_port(*direction, port_name.clone(), default);
            }
        }
    }
}

/// Create (or type-check) the blackboard entry behind every pointer-valued
/// port, using the port's declared type.
fn create_port_entries(
    config: &mut NodeConfig,
    manifest: &TreeNodeManifest,
) -> Result<(), LogicError> {
    let bound: Vec<(String, String)> = config
        .input_ports
        .iter()
        .chain(config.output_ports.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    for (port_name, raw_value) in bound {
        let Some(key) = crate::basic_types::get_remapped_key(&port_name, &raw_value) else {
            continue;
        };
        if let Some(port_info) = manifest.ports.get(&port_name) {
            config
                .blackboard
                .create_entry(&key, port_info.type_info())?;
        }
    }

    Ok(())
}

// =========================
// Builtin node set
// =========================

fn register_builtin_nodes(factory: &mut Factory) {
    type Result<T = ()> = std::result::Result<T, LogicError>;

    fn control<T: NodeBehavior + Default + 'static>(
        factory: &mut Factory,
        id: &str,
        ports: PortsList,
    ) -> Result {
        factory.register_builder(
            id,
            NodeKind::Control,
            NodeType::Control,
            ports,
            Arc::new(|_config| Ok(Box::new(T::default()))),
        )
    }

    fn decorator<T: NodeBehavior + Default + 'static>(
        factory: &mut Factory,
        id: &str,
        ports: PortsList,
    ) -> Result {
        factory.register_builder(
            id,
            NodeKind::Decorator,
            NodeType::Decorator,
            ports,
            Arc::new(|_config| Ok(Box::new(T::default()))),
        )
    }

    fn action<T: NodeBehavior + Default + 'static>(
        factory: &mut Factory,
        id: &str,
        node_type: NodeType,
        ports: PortsList,
    ) -> Result {
        factory.register_builder(
            id,
            NodeKind::Action,
            node_type,
            ports,
            Arc::new(|_config| Ok(Box::new(T::default()))),
        )
    }

    fn condition<T: NodeBehavior + Default + 'static>(
        factory: &mut Factory,
        id: &str,
        ports: PortsList,
    ) -> Result {
        factory.register_builder(
            id,
            NodeKind::Condition,
            NodeType::Condition,
            ports,
            Arc::new(|_config| Ok(Box::new(T::default()))),
        )
    }

    fn loop_queue<T>(factory: &mut Factory, id: &str) -> Result
    where
        T: Clone + Send + Sync + FromString + 'static,
    {
        factory.register_builder(
            id,
            NodeKind::Decorator,
            NodeType::Decorator,
            define_ports!(
                input_port!("queue"),
                input_port!("if_empty" => NodeStatus, NodeStatus::Success),
                output_port!("value")
            ),
            Arc::new(|config| Ok(Box::new(LoopNode::<T>::from_config(config).map_err(
                |_| LogicError::InvalidAttribute("queue".to_string(), "unparsable".to_string()),
            )?))),
        )
    }

    let result: Result = (|| {
        // Controls
        control::<SequenceNode>(factory, "Sequence", PortsList::new())?;
        control::<SequenceWithMemoryNode>(factory, "SequenceWithMemory", PortsList::new())?;
        control::<ReactiveSequenceNode>(factory, "ReactiveSequence", PortsList::new())?;
        control::<FallbackNode>(factory, "Fallback", PortsList::new())?;
        control::<ReactiveFallbackNode>(factory, "ReactiveFallback", PortsList::new())?;
        control::<IfThenElseNode>(factory, "IfThenElse", PortsList::new())?;
        control::<WhileDoElseNode>(factory, "WhileDoElse", PortsList::new())?;
        control::<ParallelNode>(
            factory,
            "Parallel",
            define_ports!(
                input_port!("success_count" => i32, -1),
                input_port!("failure_count" => i32, 1)
            ),
        )?;
        control::<ParallelAllNode>(
            factory,
            "ParallelAll",
            define_ports!(input_port!("max_failures" => i32, 1)),
        )?;
        for cases in 2..=6usize {
            let mut ports = define_ports!(input_port!("variable"));
            for port in SwitchNode::case_ports(cases) {
                let (_, info) = input_port!("case");
                ports.insert(port, info);
            }
            factory.register_builder(
                format!("Switch{cases}"),
                NodeKind::Control,
                NodeType::Control,
                ports,
                Arc::new(move |_config| Ok(Box::new(SwitchNode::new(cases)))),
            )?;
        }

        // Decorators
        decorator::<InverterNode>(factory, "Inverter", PortsList::new())?;
        decorator::<ForceSuccessNode>(factory, "ForceSuccess", PortsList::new())?;
        decorator::<ForceFailureNode>(factory, "ForceFailure", PortsList::new())?;
        decorator::<KeepRunningUntilFailureNode>(
            factory,
            "KeepRunningUntilFailure",
            PortsList::new(),
        )?;
        decorator::<RepeatNode>(
            factory,
            "Repeat",
            define_ports!(input_port!("num_cycles" => i32, -1)),
        )?;
        decorator::<RetryNode>(
            factory,
            "RetryUntilSuccessful",
            define_ports!(input_port!("num_attempts" => i32, -1)),
        )?;
        decorator::<RunOnceNode>(
            factory,
            "RunOnce",
            define_ports!(input_port!("then_skip" => bool, true)),
        )?;
        decorator::<TimeoutNode>(
            factory,
            "Timeout",
            define_ports!(input_port!("msec" => u64)),
        )?;
        decorator::<DelayNode>(
            factory,
            "Delay",
            define_ports!(input_port!("delay_msec" => u64)),
        )?;
        decorator::<PreconditionNode>(
            factory,
            "Precondition",
            define_ports!(
                input_port!("if"),
                input_port!("else" => NodeStatus, NodeStatus::Failure)
            ),
        )?;
        factory.register_builder(
            "SkipUnlessUpdated",
            NodeKind::Decorator,
            NodeType::Decorator,
            define_ports!(input_port!("entry")),
            Arc::new(|_config| Ok(Box::new(EntryUpdatedNode::new(NodeStatus::Skipped)))),
        )?;
        factory.register_builder(
            "WaitValueUpdate",
            NodeKind::Decorator,
            NodeType::Decorator,
            define_ports!(input_port!("entry")),
            Arc::new(|_config| Ok(Box::new(EntryUpdatedNode::new(NodeStatus::Running)))),
        )?;
        loop_queue::<i64>(factory, "LoopInt")?;
        loop_queue::<f64>(factory, "LoopDouble")?;
        loop_queue::<String>(factory, "LoopString")?;
        loop_queue::<bool>(factory, "LoopBool")?;

        // The SubTree wrapper; its attributes are wired by the factory
        factory.register_builder(
            "SubTree",
            NodeKind::SubTree,
            NodeType::Decorator,
            define_ports!(input_port!("_autoremap" => bool, false)),
            Arc::new(|_config| Ok(Box::new(SubtreeNode))),
        )?;

        // Actions and conditions
        action::<AlwaysSuccess>(factory, "AlwaysSuccess", NodeType::SyncAction, PortsList::new())?;
        action::<AlwaysFailure>(factory, "AlwaysFailure", NodeType::SyncAction, PortsList::new())?;
        action::<SetBlackboard>(
            factory,
            "SetBlackboard",
            NodeType::SyncAction,
            define_ports!(input_port!("value"), output_port!("output_key")),
        )?;
        action::<UnsetBlackboard>(
            factory,
            "UnsetBlackboard",
            NodeType::SyncAction,
            define_ports!(input_port!("key" => String)),
        )?;
        action::<ScriptNode>(
            factory,
            "Script",
            NodeType::SyncAction,
            define_ports!(input_port!("code")),
        )?;
        condition::<ScriptCondition>(
            factory,
            "ScriptCondition",
            define_ports!(input_port!("code")),
        )?;
        action::<SleepNode>(
            factory,
            "Sleep",
            NodeType::StatefulAction,
            define_ports!(input_port!("msec" => u64, 0)),
        )?;
        condition::<WasEntryUpdated>(
            factory,
            "WasEntryUpdated",
            define_ports!(input_port!("entry")),
        )?;

        Ok(())
    })();

    // Registration of builtins only fails on a programming error in this
    // crate itself.
    if let Err(err) = result {
        panic!("builtin node registration failed: {err}");
    }
}
