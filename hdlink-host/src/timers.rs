//! Thread-backed timer service
//!
//! Each scheduled timer sleeps on its own thread and then sends its handle
//! over a channel. A single dispatcher thread drains the channel and feeds
//! the link, so expiry never runs on the sleeper threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hdlink_hal::{TimerHandle, TimerService};

pub struct ThreadTimers {
    next_id: u32,
    expired: Sender<TimerHandle>,
    /// Cancel flags of timers whose sleeper may still be running
    armed: HashMap<TimerHandle, Arc<AtomicBool>>,
}

impl ThreadTimers {
    pub fn new(expired: Sender<TimerHandle>) -> Self {
        Self {
            next_id: 0,
            expired,
            armed: HashMap::new(),
        }
    }
}

impl TimerService for ThreadTimers {
    fn schedule_once(&mut self, delay_ms: u32) -> TimerHandle {
        // Sleepers drop their clone on exit
        self.armed.retain(|_, flag| Arc::strong_count(flag) > 1);

        self.next_id = self.next_id.wrapping_add(1);
        let handle = TimerHandle::new(self.next_id);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.armed.insert(handle, Arc::clone(&cancelled));

        let expired = self.expired.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(u64::from(delay_ms)));
            if !cancelled.load(Ordering::Acquire) {
                // Receiver gone means shutdown
                let _ = expired.send(handle);
            }
        });

        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(flag) = self.armed.remove(&handle) {
            flag.store(true, Ordering::Release);
        }
    }
}
