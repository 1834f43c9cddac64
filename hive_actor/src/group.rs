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

use std::{
    sync::{atomic::{AtomicBool, Ordering}, Arc, Mutex},
    time::Duration
};
use serde::Deserialize;
use tokio::runtime::{Builder, Handle, Runtime};

use hive_sched::Scheduler;
use crate::errors::{poisoned_lock, schedule_failed, HiveActorError, Result};

/* #region GroupConfig *************************************************************************/

/// group construction parameters. Note `worker_threads == 0` keeps the runtime default
/// (one worker per core)
#[derive(Debug,Clone,Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub worker_threads: usize,
    pub max_pending_jobs: usize
}

impl Default for GroupConfig {
    fn default ()->Self {
        GroupConfig { name: "hive".to_string(), worker_threads: 0, max_pending_jobs: 1024 }
    }
}

impl GroupConfig {
    pub fn from_ron (input: &str)->Result<Self> {
        ron::from_str(input).map_err( |e| HiveActorError::ConfigParseError( e.to_string()))
    }
}

/* #endregion GroupConfig */

/* #region ActorGroup **************************************************************************/

struct GroupInner {
    config: GroupConfig,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    stopped: AtomicBool,
    killed: AtomicBool,
    scheduler: Mutex<Scheduler>
}

impl Drop for GroupInner {
    fn drop (&mut self) {
        // the last clone might get dropped from within a pool worker, where a blocking
        // runtime shutdown is not allowed
        if let Ok(mut runtime) = self.runtime.lock() {
            if let Some(runtime) = runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

/// the shared worker pool plus stop/kill signaling and delayed scheduling for a set of actors.
/// An ActorGroup owns a multi-threaded runtime; actors register themselves through [`submit`]
/// and get their bounded work-loop executed on whatever worker is free next.
///
/// ActorGroup is a cheap-clone handle - all clones control the same pool.
///
/// [`submit`]: ActorGroup::submit
#[derive(Clone)]
pub struct ActorGroup {
    inner: Arc<GroupInner>
}

impl ActorGroup {
    pub fn new ()->Result<Self> {
        Self::with_config( GroupConfig::default())
    }

    pub fn with_config (config: GroupConfig)->Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name( config.name.clone());
        if config.worker_threads > 0 { builder.worker_threads( config.worker_threads); }
        let runtime = builder.build()?;

        let handle = runtime.handle().clone();
        let mut scheduler = Scheduler::with_max_pending( config.max_pending_jobs);
        scheduler.run( &handle).map_err( |e| schedule_failed(e))?;

        Ok( ActorGroup {
            inner: Arc::new( GroupInner {
                config,
                runtime: Mutex::new( Some(runtime)),
                handle,
                stopped: AtomicBool::new(false),
                killed: AtomicBool::new(false),
                scheduler: Mutex::new(scheduler)
            })
        })
    }

    pub fn name (&self)->&str {
        self.inner.config.name.as_str()
    }

    pub fn config (&self)->&GroupConfig {
        &self.inner.config
    }

    /// true once [`stop`] or [`kill`] ran - new sends fail with a precondition error
    ///
    /// [`stop`]: ActorGroup::stop
    /// [`kill`]: ActorGroup::kill
    pub fn is_stopped (&self)->bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// read by the dispatch check: once set, queued messages are cancelled instead of
    /// delivered. Best-effort - a dispatch already past its check still delivers
    pub fn is_killed (&self)->bool {
        self.inner.killed.load(Ordering::Acquire)
    }

    /// license one work-loop turn on a free pool worker
    pub fn submit (&self, work: impl FnOnce() + Send + 'static) {
        self.inner.handle.spawn( async move { work() });
    }

    /// arrange for `action` to run once `delay` elapsed (used by the delayed send path)
    pub fn schedule (&self, delay: Duration, action: impl FnMut() + Send + 'static)->Result<()> {
        let mut scheduler = self.inner.scheduler.lock().map_err( |_| poisoned_lock("group scheduler"))?;
        scheduler.schedule_once( delay, action).map( |_| ()).map_err( |e| schedule_failed(e))
    }

    /// graceful shutdown: no new sends are admitted but already queued messages still get
    /// dispatched, for at most `to`. Must not be called from receive code
    pub fn stop (&self, to: Duration)->Result<()> {
        self.inner.stopped.store( true, Ordering::Release);

        if let Ok(mut scheduler) = self.inner.scheduler.lock() {
            scheduler.abort();
        }

        let runtime = self.inner.runtime.lock().map_err( |_| poisoned_lock("group runtime"))?.take();
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(to);
        }
        Ok(())
    }

    /// hard shutdown: blocks new sends and flags all pending work for cancellation. Workers
    /// keep draining mailboxes so queued envelopes observe their terminal (cancelled) state
    pub fn kill (&self) {
        self.inner.killed.store( true, Ordering::Release);
        self.inner.stopped.store( true, Ordering::Release);

        if let Ok(mut scheduler) = self.inner.scheduler.lock() {
            scheduler.clear();
            scheduler.abort();
        }
    }
}

/* #endregion ActorGroup */


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults () {
        let config = GroupConfig::default();
        assert_eq!( config.name, "hive");
        assert_eq!( config.worker_threads, 0);
        assert_eq!( config.max_pending_jobs, 1024);
    }

    #[test]
    fn config_parses_from_ron () {
        let config = GroupConfig::from_ron( r#"( name: "blah", worker_threads: 2, max_pending_jobs: 64 )"#).unwrap();
        assert_eq!( config.name, "blah");
        assert_eq!( config.worker_threads, 2);
        assert_eq!( config.max_pending_jobs, 64);
    }

    #[test]
    fn partial_ron_falls_back_to_defaults () {
        let config = GroupConfig::from_ron( r#"( name: "blah" )"#).unwrap();
        assert_eq!( config.name, "blah");
        assert_eq!( config.worker_threads, 0);
    }

    #[test]
    fn malformed_ron_is_a_parse_error () {
        assert!( matches!( GroupConfig::from_ron("( name: )"), Err(HiveActorError::ConfigParseError(_))));
    }

    #[test]
    fn stop_and_kill_flags () {
        let group = ActorGroup::new().unwrap();
        assert!( !group.is_stopped());
        assert!( !group.is_killed());

        group.kill();
        assert!( group.is_stopped());
        assert!( group.is_killed());
    }
}
