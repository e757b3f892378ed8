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

/// The delay node will introduce a delay of `delay_msec` milliseconds and
/// then tick the child returning the status of the child as it is upon
/// completion. The delay is scheduled on the first tick; while waiting the
/// node returns RUNNING.
#[derive(Default)]
pub struct DelayNode {
    timer: Option<TimerQueue>,
    timer_id: Option<u64>,
    delay_started: bool,
    delay_complete: Arc<AtomicBool>,
}

impl DelayNode {
    fn reset(&mut self) {
        if let (Some(timer), Some(id)) = (&self.timer, self.timer_id.take()) {
            timer.cancel(id);
        }
        self.delay_started = false;
        self.delay_complete.store(false, Ordering::SeqCst);
    }
}

impl NodeBehavior for DelayNode {
    fn tick<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let delay_msec: u64 = node.config.get_input("delay_msec")?;

            node.set_status(NodeStatus::Running);

            if !self.delay_started {
                self.delay_started = true;
                self.delay_complete.store(false, Ordering::SeqCst);

                let complete = Arc::clone(&self.delay_complete);
                let wake_up = node.config.wake_up();

                let timer = self.timer.get_or_insert_with(TimerQueue::new);
                let id = timer.add(Duration::from_millis(delay_msec), move |aborted| {
                    if !aborted {
                        complete.store(true, Ordering::SeqCst);
                        if let Some(wake_up) = wake_up {
                            wake_up.emit_signal();
                        }
                    }
                });
                self.timer_id = Some(id);
            }

            if !self.delay_complete.load(Ordering::SeqCst) {
                return Ok(NodeStatus::Running);
            }

            let child = node.child().ok_or(NodeError::ChildMissing)?;
            let child_status = child.execute_tick().await?;

            if child_status.is_completed() {
                self.reset();
                node.reset_child().await;
            }

            Ok(child_status)
        })
    }

    fn halt<'a>(&'a mut self, node: &'a mut NodeData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.reset();
            node.reset_child().await;
        })
    }
}
