use std::collections::HashMap;

/// One element of the logical tree model.
///
/// The model is what the factory consumes; it carries no behavior, only the
/// registration id, the raw attributes (ports, pre/post-condition scripts,
/// `name`, `ID`) and the child elements. How it was produced — the bundled
/// XML front-end, or any other parser — is irrelevant to instantiation.
#[derive(Debug, Clone)]
pub struct NodeModel {
    pub registration_id: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<NodeModel>,
}

impl NodeModel {
    pub fn new(registration_id: impl AsRef<str>) -> NodeModel {
        Self {
            registration_id: registration_id.as_ref().to_string(),
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter, for models assembled in code.
    pub fn attribute(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> NodeModel {
        self.attributes
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Builder-style child appender, for models assembled in code.
    pub fn child(mut self, child: NodeModel) -> NodeModel {
        self.children.push(child);
        self
    }

    /// The instance name: the `name` attribute when present.
    pub fn instance_name(&self) -> Option<&str> {
        self.attributes.get("name").map(String::as_str)
    }
}

/// A named tree: the `BehaviorTree` element and its single root child.
#[derive(Debug, Clone)]
pub struct TreeModel {
    pub id: String,
    pub root: NodeModel,
}

impl TreeModel {
    pub fn new(id: impl AsRef<str>, root: NodeModel) -> TreeModel {
        Self {
            id: id.as_ref().to_string(),
            root,
        }
    }
}

/// What a tree-format parser hands to the factory: the trees plus the
/// optional designated main tree.
#[derive(Debug, Clone, Default)]
pub struct TreeModelCollection {
    pub trees: Vec<TreeModel>,
    pub main_tree_id: Option<String>,
}
