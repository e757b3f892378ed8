use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
    scripting::EnumsTablePtr,
};

/// Equivalent of a switch statement: the `variable` port is compared with
/// the `case_1..case_N` ports and the matching child is ticked; the last
/// child is the default branch. When the matching branch changes while the
/// previous one is RUNNING, the previous one is halted.
///
/// Registered as `Switch2`..`Switch6`.
pub struct SwitchNode {
    case_count: usize,
    running_child: i32,
}

impl SwitchNode {
    pub fn new(case_count: usize) -> SwitchNode {
        Self {
            case_count,
            running_child: -1,
        }
    }

    pub fn case_ports(case_count: usize) -> Vec<String> {
        (1..=case_count).map(|i| format!("case_{i}")).collect()
    }
}

/// Equality ladder used on case values: string equality first, then
/// integers (resolving enum names through the registry), then doubles
/// within `f32` epsilon.
fn check_string_equality(left: &str, right: &str, enums: &EnumsTablePtr) -> bool {
    if left == right {
        return true;
    }

    let to_int = |text: &str| -> Option<i64> {
        if let Some(value) = enums.lock().unwrap().get(text) {
            return Some(*value);
        }
        text.trim().parse::<i64>().ok()
    };
    if let (Some(l), Some(r)) = (to_int(left), to_int(right)) {
        if l == r {
            return true;
        }
    }

    let to_real = |text: &str| text.trim().parse::<f64>().ok();
    if let (Some(l), Some(r)) = (to_real(left), to_real(right)) {
        if (l - r).abs() <= f32::EPSILON as f64 {
            return true;
        }
    }

    false
}

impl NodeBehavior for SwitchNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            if node.children.len() != self.case_count + 1 {
                return Err(NodeError::NodeStructureError(format!(
                    "[Switch{0}]: must have exactly {1} children",
                    self.case_count,
                    self.case_count + 1
                )));
            }

            node.set_status(NodeStatus::Running);

            // The default branch is the last child
            let mut match_index = self.case_count;

            if let Ok(variable) = node.config.get_input::<String>("variable") {
                for (index, port) in Self::case_ports(self.case_count).iter().enumerate() {
                    // An unset case falls through to the default child
                    if let Ok(case_value) = node.config.get_input::<String>(port) {
                        if check_string_equality(&variable, &case_value, &node.config.enums) {
                            match_index = index;
                            break;
                        }
                    }
                }
            }

            // The branch changed: halt the one that was running
            if self.running_child >= 0 && self.running_child != match_index as i32 {
                node.halt_child_idx(self.running_child as usize).await?;
            }

            let child_status = node.children[match_index].execute_tick().await?;
            match child_status {
                NodeStatus::Running => {
                    self.running_child = match_index as i32;
                    Ok(NodeStatus::Running)
                }
                status => {
                    node.halt_child_idx(match_index).await?;
                    self.running_child = -1;
                    Ok(status)
                }
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.running_child = -1;
            node.reset_children().await;
        })
    }
}
