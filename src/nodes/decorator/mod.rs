mod delay;
mod entry_updated;
mod force_failure;
mod force_success;
mod inverter;
mod keep_running_until_failure;
mod loop_queue;
mod precondition;
mod repeat;
mod retry;
mod run_once;
mod subtree;
mod timeout;

pub use delay::DelayNode;
pub use entry_updated::EntryUpdatedNode;
pub use force_failure::ForceFailureNode;
pub use force_success::ForceSuccessNode;
pub use inverter::InverterNode;
pub use keep_running_until_failure::KeepRunningUntilFailureNode;
pub use loop_queue::{LoopNode, SharedQueue};
pub use precondition::PreconditionNode;
pub use repeat::RepeatNode;
pub use retry::RetryNode;
pub use run_once::RunOnceNode;
pub use subtree::SubtreeNode;
pub use timeout::TimeoutNode;
