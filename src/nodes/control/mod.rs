mod fallback;
mod if_then_else;
mod parallel;
mod parallel_all;
mod reactive_fallback;
mod reactive_sequence;
mod sequence;
mod sequence_with_memory;
mod switch;
mod while_do_else;

pub use fallback::FallbackNode;
pub use if_then_else::IfThenElseNode;
pub use parallel::ParallelNode;
pub use parallel_all::ParallelAllNode;
pub use reactive_fallback::ReactiveFallbackNode;
pub use reactive_sequence::ReactiveSequenceNode;
pub use sequence::SequenceNode;
pub use sequence_with_memory::SequenceWithMemoryNode;
pub use switch::SwitchNode;
pub use while_do_else::WhileDoElseNode;
