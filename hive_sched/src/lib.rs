/*
 * Copyright (c) 2024, United States Government, as represented by the
 * Administrator of the National Aeronautics and Space Administration.
 * All rights reserved.
 *
 * The RACE - Runtime for Airspace Concept Evaluation platform is licensed
 * under the Apache License, Version 2.0 (the "License"); you may not use
 * this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
#![allow(unused)]

/// hive_sched is a basic scheduler crate for sendable `FnMut` actions. Tasks can be scheduled
/// as oneshot or repeat, with a millisecond schedule resolution (which is more than most
/// operating systems provide anyways). The timer loop runs on a caller provided tokio runtime
/// handle so that the owner (e.g. an actor group) controls on which worker pool it lives.
/// The only exposed types are [`Scheduler`] and [`TaskHandle`]. Both are opaque.
///
/// Basic example:
///```
///  use hive_sched::Scheduler;
///  ...
///  let mut scheduler = Scheduler::new();
///  scheduler.run( &tokio::runtime::Handle::current())?;
///  ...
///  scheduler.schedule_once( Duration::from_secs(4), || println!("Hola!"));
///```

use tokio::{select, runtime::Handle, task::JoinHandle, time::{sleep, Sleep}};
use kanal::{AsyncReceiver, AsyncSender};
use std::{collections::VecDeque, fmt::Debug,
          sync::{Arc, Mutex},
          time::{Duration, SystemTime}};
use anyhow::{anyhow, Result};

struct Task {
    id: u64,
    due_millis: u64,
    period_millis: u64,
    action: Box<dyn FnMut() + Send>
}
impl Task {
    fn deadline (&self)->Sleep {
        let now_millis = now_epoch_millis();
        let wait_millis = if now_millis >= self.due_millis { 0 } else { self.due_millis - now_millis };
        sleep( Duration::from_millis( wait_millis))
    }

    fn run (&mut self) {
        (self.action)();
    }
}
impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let abbrv_due = self.due_millis & 0x0000ffff;
        write!(f, "Task(id:{},due_millis:…{},period_millis:{})", self.id, abbrv_due, self.period_millis)
    }
}

#[derive(Debug)]
pub struct TaskHandle(u64);

struct WakeUp{}

pub struct Scheduler {
    next_id: u64,
    queue: Arc<Mutex<VecDeque<Task>>>,
    max_pending: usize,
    tx: Option<AsyncSender<WakeUp>>,
    timer: Option<JoinHandle<()>>
}

impl Scheduler {
    pub fn new ()->Self {
        Self::with_max_pending( usize::MAX)
    }

    pub fn with_max_pending (max_pending: usize)->Self {
        Scheduler {
            next_id: 1, // note we start at id 1 (0 means no task)
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(32))),
            max_pending,
            tx: None,
            timer: None
        }
    }

    /// spawn the timer loop on the provided runtime handle. Note that actions are always
    /// executed from within that loop, i.e. never while holding the queue lock of the caller
    pub fn run (&mut self, handle: &Handle)->Result<()> {
        if self.timer.is_some() { return Err(anyhow!("scheduler already running")) }

        let (tx,rx) = kanal::unbounded_async::<WakeUp>();
        self.tx = Some(tx);

        let queue = self.queue.clone();
        self.timer = Some( handle.spawn( async move {
            loop {
                let next_deadline: Option<Sleep> = {
                    let queue = queue.lock().unwrap();
                    queue.front().map(|task| task.deadline())
                };

                if let Some(deadline) = next_deadline {
                    tokio::pin!(deadline);

                    select! {
                        _ = rx.recv() => {} // just a wakeup interrupt to schedule the next front()
                        () = &mut deadline => {
                            let due = { queue.lock().unwrap().pop_front() };
                            if let Some(mut task) = due {
                                task.run(); // outside the queue lock - actions might schedule themselves

                                if task.period_millis > 0 {
                                    // note we reschedule with the same id
                                    task.due_millis += task.period_millis;
                                    let mut queue = queue.lock().unwrap();
                                    sort_in( task, &mut queue);
                                }
                            }
                        }
                    }

                } else { // queue is empty - wait for wakeup
                    if rx.recv().await.is_err() { break }
                }
            }
        }));
        Ok(())
    }

    pub fn is_running (&self)->bool { self.timer.is_some() }

    pub fn schedule_once (&mut self, after: Duration, action: impl FnMut()+Send+'static)->Result<TaskHandle> {
        self.schedule( after, None, action)
    }

    pub fn schedule_repeated (&mut self, after: Duration, interval: Duration, action: impl FnMut()+Send+'static)->Result<TaskHandle> {
        self.schedule( after, Some(interval), action)
    }

    pub fn schedule (&mut self, after: Duration, interval: Option<Duration>, mut action: impl FnMut()+Send+'static)->Result<TaskHandle> {
        if let Some(tx) = &self.tx {
            if after.is_zero() {
                action(); // execute right away, before we acquire the queue lock - the action might schedule itself
                if interval.is_none() {
                    let id = self.next_id;
                    self.next_id += 1;
                    return Ok(TaskHandle(id))
                }
            }

            let mut queue = self.queue.lock().unwrap();

            if queue.len() < self.max_pending {
                let id = self.next_id;
                self.next_id += 1;

                let period_millis = if let Some(interval) = interval { interval.as_millis() as u64 } else { 0 };
                let mut due_millis = now_epoch_millis() + after.as_millis() as u64;
                if after.is_zero() && period_millis > 0 { due_millis += period_millis }

                let task = Task { id, due_millis, period_millis, action: Box::new(action) };

                if sort_in( task, &mut queue) == 0 {
                    tx.try_send( WakeUp{});
                }

                Ok(TaskHandle(id))
            } else {
                Err(anyhow!("max pending tasks exceeded"))
            }

        } else {
            Err(anyhow!("scheduler not running"))
        }
    }

    pub fn is_pending (&self, th: &TaskHandle)->bool {
        let queue = self.queue.lock().unwrap();
        let id = th.0;

        if id > 0 && id < self.next_id {
            for task in queue.iter() {
                if task.id == id {
                    return true;
                }
            }
        }
        false
    }

    pub fn abort_task (&mut self, th: TaskHandle)->bool {
        let mut queue = self.queue.lock().unwrap();
        let id = th.0;

        if id > 0 && id < self.next_id {
            for (idx,task) in queue.iter().enumerate() {
                if task.id == id {
                    queue.remove(idx);
                    return true;
                }
            }
        }
        false
    }

    pub fn clear (&mut self) {
        let mut queue = self.queue.lock().unwrap();
        queue.clear();
    }

    // don't block here - this should be infallible
    pub fn abort (&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort(); // this will stop pending tasks from being executed
            self.tx = None;
            self.next_id = 1;
        }
    }
}

// ensure this is only called after acquiring the queue lock
fn sort_in (task: Task, queue: &mut VecDeque<Task>)->usize {
    let pos = queue.iter().position( |t| task.due_millis < t.due_millis).unwrap_or( queue.len());
    queue.insert( pos, task);
    pos
}

#[inline]
fn now_epoch_millis ()->u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap().as_millis() as u64
}

#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
