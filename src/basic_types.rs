use std::{collections::HashMap, convert::Infallible, str::FromStr};

use thiserror::Error;

use crate::{
    any::{Any, TypeInfo},
    macros::{impl_from_string, impl_into_string},
};

/// Classification of a node kind as it appears in the tree model.
///
/// This is the at-rest category used for model validation; it is distinct
/// from the runtime dispatch category ([`crate::nodes::NodeType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf node that executes an action
    Action,
    /// Leaf node that checks a condition, never returns `Running`
    Condition,
    /// Node with multiple children that dispatches them in some way.
    /// Examples like `Sequence`, `Parallel`.
    Control,
    /// Node with one child that modifies the execution or result of the child.
    Decorator,
    /// Node that wraps the root of another registered tree.
    SubTree,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Action => "Action",
            Self::Condition => "Condition",
            Self::Control => "Control",
            Self::Decorator => "Decorator",
            Self::SubTree => "SubTree",
        };

        write!(f, "{text}")
    }
}

/// Specifies the status of a node's execution. Returned from
/// `execute_tick()` and `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Idle,
    Running,
    Success,
    Failure,
    Skipped,
}

impl NodeStatus {
    /// A node is active unless it is `Idle` or was skipped.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Skipped)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn into_string_color(&self) -> String {
        let color_start = match self {
            Self::Idle => "\x1b[36m",
            Self::Running => "\x1b[33m",
            Self::Success => "\x1b[32m",
            Self::Failure => "\x1b[31m",
            Self::Skipped => "\x1b[34m",
        };

        color_start.to_string() + &self.bt_to_string() + "\x1b[0m"
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Skipped => "SKIPPED",
        };

        write!(f, "{text}")
    }
}

#[derive(Error, Debug)]
pub enum ParseNodeStatusError {
    #[error("string didn't match any NodeStatus values")]
    NoMatch,
}

#[derive(Error, Debug)]
pub enum ParseNodeKindError {
    #[error("string didn't match any NodeKind values")]
    NoMatch,
}

#[derive(Error, Debug)]
pub enum ParsePortDirectionError {
    #[error("string didn't match any PortDirection values")]
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    InOut,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::InOut => "InOut",
        };

        write!(f, "{text}")
    }
}

// ===========================
// Converting string to types
// ===========================

/// Trait for conversion from a raw port string.
///
/// Out of the box, `FromString` is implemented on all numeric types, `bool`,
/// `String`, `NodeStatus`, `NodeKind`, `PortDirection`, and `Vec`s of those
/// types (`;` separated).
///
/// Implement it on your own port types; the blanket macro used internally
/// calls `str::parse()`, so a `FromStr` implementation is usually all you
/// need to write.
pub trait FromString
where
    Self: Sized,
{
    type Err;

    fn from_string(value: impl AsRef<str>) -> Result<Self, Self::Err>;
}

impl<T> FromString for Vec<T>
where
    T: FromString,
{
    type Err = <T as FromString>::Err;

    fn from_string(value: impl AsRef<str>) -> Result<Vec<T>, Self::Err> {
        value
            .as_ref()
            .split(';')
            .map(|x| T::from_string(x))
            .collect()
    }
}

impl_from_string!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl FromString for String {
    type Err = Infallible;

    fn from_string(value: impl AsRef<str>) -> Result<String, Self::Err> {
        Ok(value.as_ref().to_string())
    }
}

#[derive(Error, Debug)]
pub enum ParseBoolError {
    #[error("string wasn't one of the expected: 1/0, true/false, TRUE/FALSE")]
    ParseError,
}

impl FromString for bool {
    type Err = ParseBoolError;

    fn from_string(value: impl AsRef<str>) -> Result<bool, ParseBoolError> {
        match value.as_ref() {
            "1" | "true" | "TRUE" => Ok(true),
            "0" | "false" | "FALSE" => Ok(false),
            _ => Err(ParseBoolError::ParseError),
        }
    }
}

impl FromString for NodeStatus {
    type Err = ParseNodeStatusError;

    fn from_string(value: impl AsRef<str>) -> Result<NodeStatus, Self::Err> {
        match value.as_ref() {
            "IDLE" | "Idle" => Ok(NodeStatus::Idle),
            "RUNNING" | "Running" => Ok(NodeStatus::Running),
            "SUCCESS" | "Success" => Ok(NodeStatus::Success),
            "FAILURE" | "Failure" => Ok(NodeStatus::Failure),
            "SKIPPED" | "Skipped" => Ok(NodeStatus::Skipped),
            _ => Err(ParseNodeStatusError::NoMatch),
        }
    }
}

impl FromString for NodeKind {
    type Err = ParseNodeKindError;

    fn from_string(value: impl AsRef<str>) -> Result<NodeKind, Self::Err> {
        match value.as_ref() {
            "Action" => Ok(NodeKind::Action),
            "Condition" => Ok(NodeKind::Condition),
            "Control" => Ok(NodeKind::Control),
            "Decorator" => Ok(NodeKind::Decorator),
            "SubTree" => Ok(NodeKind::SubTree),
            _ => Err(ParseNodeKindError::NoMatch),
        }
    }
}

impl FromString for PortDirection {
    type Err = ParsePortDirectionError;

    fn from_string(value: impl AsRef<str>) -> Result<PortDirection, Self::Err> {
        match value.as_ref() {
            "Input" | "INPUT" => Ok(PortDirection::Input),
            "Output" | "OUTPUT" => Ok(PortDirection::Output),
            "InOut" | "INOUT" => Ok(PortDirection::InOut),
            _ => Err(ParsePortDirectionError::NoMatch),
        }
    }
}

pub trait BTToString {
    fn bt_to_string(&self) -> String;
}

impl BTToString for String {
    fn bt_to_string(&self) -> String {
        self.clone()
    }
}

impl_into_string!(
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    bool,
    NodeStatus,
    NodeKind,
    PortDirection,
    &str
);

// ===========================
// End of String Conversions
// ===========================

pub type PortsList = HashMap<String, PortInfo>;

/// Static description of a registered node kind: its category, registration
/// id, declared ports and optional free-form description.
#[derive(Clone, Debug)]
pub struct TreeNodeManifest {
    pub kind: NodeKind,
    pub registration_id: String,
    pub ports: PortsList,
    pub description: String,
}

impl TreeNodeManifest {
    pub fn new(
        kind: NodeKind,
        registration_id: impl AsRef<str>,
        ports: PortsList,
        description: impl AsRef<str>,
    ) -> TreeNodeManifest {
        Self {
            kind,
            registration_id: registration_id.as_ref().to_string(),
            ports,
            description: description.as_ref().to_string(),
        }
    }
}

// ===========================
// Ports
// ===========================

/// Attribute names that the model reserves for the runtime. They are never
/// valid port names.
pub const RESERVED_ATTRIBUTES: [&str; 13] = [
    "name",
    "ID",
    "_autoremap",
    "_successIf",
    "_failureIf",
    "_skipIf",
    "_while",
    "_onSuccess",
    "_onFailure",
    "_onHalted",
    "_post",
    "_uid",
    "_fullpath",
];

pub trait PortChecks {
    fn is_allowed_port_name(&self) -> bool;
}

impl<T: AsRef<str>> PortChecks for T {
    fn is_allowed_port_name(&self) -> bool {
        let name = self.as_ref();

        if name.is_empty() {
            false
        } else if name == "_autoremap" {
            true
        } else if !name.chars().next().unwrap().is_ascii_alphabetic() {
            false
        } else {
            // If the name isn't name or ID, it's valid
            !(name == "name" || name == "ID")
        }
    }
}

pub type PortsRemapping = HashMap<String, String>;

/// Declared metadata of a single port: direction, type information,
/// description and an optional default (kept both as a typed value and in
/// the raw string form it was authored in).
#[derive(Clone, Debug)]
pub struct PortInfo {
    direction: PortDirection,
    type_info: TypeInfo,
    description: String,
    default_value: Option<Any>,
    default_value_str: Option<String>,
}

impl PortInfo {
    pub fn new(direction: PortDirection) -> PortInfo {
        Self {
            direction,
            type_info: TypeInfo::any_allowed(),
            description: String::new(),
            default_value: None,
            default_value_str: None,
        }
    }

    pub fn new_typed(direction: PortDirection, type_info: TypeInfo) -> PortInfo {
        Self {
            direction,
            type_info,
            description: String::new(),
            default_value: None,
            default_value_str: None,
        }
    }

    pub fn default_value(&self) -> Option<&Any> {
        self.default_value.as_ref()
    }

    pub fn default_value_str(&self) -> Option<String> {
        self.default_value_str.clone()
    }

    /// Store a default. The raw string form is what gets injected into an
    /// unbound port at instantiation time, so blackboard-pointer defaults
    /// like `"{other}"` keep working.
    pub fn set_default(&mut self, default: impl Clone + Send + Sync + BTToString + 'static) {
        self.default_value_str = Some(default.bt_to_string());
        self.default_value = Some(Any::new(default));
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn direction(&self) -> &PortDirection {
        &self.direction
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }
}

/// Resolve the blackboard key a port refers to.
///
/// `"{=}"` (and the bare `"="`) mean "same key as the port name"; any other
/// `{key}` pointer resolves to the inner key. A plain literal resolves to
/// `None`.
pub fn get_remapped_key(
    port_name: impl AsRef<str>,
    remapped_port: impl AsRef<str>,
) -> Option<String> {
    let remapped = remapped_port.as_ref();
    if remapped == "=" || remapped == "{=}" {
        Some(port_name.as_ref().to_string())
    } else {
        crate::blackboard::BlackboardString::strip_bb_pointer(&remapped)
    }
}
