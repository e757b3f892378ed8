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
    nodes::{NodeBehavior, NodeData, NodeError, NodeResult},
    timer_queue::TimerQueue,
};

/// Halts the child and returns FAILURE when the child has been RUNNING for
/// longer than the `msec` port.
///
/// The deadline is a scheduled timer: when it fires it raises the wake-up
/// signal, and the tick that observes it halts the child. If the child
/// completes first the timer is cancelled.
#[derive(Default)]
pub struct TimeoutNode {
    timer: Option<TimerQueue>,
    timer_id: Option<u64>,
    timeout_started: bool,
    timed_out: Arc<AtomicBool>,
}

impl TimeoutNode {
    fn cancel_timer(&mut self) {
        if let (Some(timer), Some(id)) = (&self.timer, self.timer_id.take()) {
            timer.cancel(id);
        }
        self.timeout_started = false;
        self.timed_out.store(false, Ordering::SeqCst);
    }
}

impl NodeBehavior for TimeoutNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let msec: u64 = node.config.get_input("msec")?;

            node.set_status(NodeStatus::Running);

            if !self.timeout_started && msec > 0 {
                self.timeout_started = true;
                self.timed_out.store(false, Ordering::SeqCst);

                let timed_out = Arc::clone(&self.timed_out);
                let wake_up = node.config.wake_up();

                let timer = self.timer.get_or_insert_with(TimerQueue::new);
                let id = timer.add(Duration::from_millis(msec), move |aborted| {
                    if !aborted {
                        timed_out.store(true, Ordering::SeqCst);
                        if let Some(wake_up) = wake_up {
                            wake_up.emit_signal();
                        }
                    }
                });
                self.timer_id = Some(id);
            }

            if self.timed_out.load(Ordering::SeqCst) {
                // The child is halted exactly once, here
                node.reset_child().await;
                self.cancel_timer();
                return Ok(NodeStatus::Failure);
            }

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            if child_status.is_completed() {
                self.cancel_timer();
                node.reset_child().await;
            }

            Ok(child_status)
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.cancel_timer();
            node.reset_child().await;
        })
    }
}
