use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::future::BoxFuture;

use crate::{
    basic_types::NodeStatus,
    nodes::{NodeBehavior, NodeData, NodeResult},
    timer_queue::TimerQueue,
};

/// Stateful action that returns `Running` until the `msec` port elapses,
/// then `Success`. The wait is a scheduled timer, not a busy loop, and it
/// wakes the tree driver when it fires. Halting cancels the timer.
#[derive(Default)]
pub struct SleepNode {
    timer: Option<TimerQueue>,
    timer_id: Option<u64>,
    done: Arc<AtomicBool>,
}

impl NodeBehavior for SleepNode {
    fn start<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let msec: u64 = node.config.get_input("msec")?;
            if msec == 0 {
                return Ok(NodeStatus::Success);
            }

            self.done.store(false, Ordering::SeqCst);
            let done = Arc::clone(&self.done);
            let wake_up = node.config.wake_up();

            let timer = self.timer.get_or_insert_with(TimerQueue::new);
            let id = timer.add(Duration::from_millis(msec), move |aborted| {
                if !aborted {
                    done.store(true, Ordering::SeqCst);
                    if let Some(wake_up) = wake_up {
                        wake_up.emit_signal();
                    }
                }
            });
            self.timer_id = Some(id);

            Ok(NodeStatus::Running)
        })
    }

    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let _ = node;
            match self.done.load(Ordering::SeqCst) {
                true => {
                    self.timer_id = None;
                    Ok(NodeStatus::Success)
                }
                false => Ok(NodeStatus::Running),
            }
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let _ = node;
            if let (Some(timer), Some(id)) = (&self.timer, self.timer_id.take()) {
                timer.cancel(id);
            }
            self.done.store(false, Ordering::SeqCst);
        })
    }
}
