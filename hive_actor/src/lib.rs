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

//! hive_actor provides queue based, single-flight message processors ([`Actor`]) that share
//! the worker pool of an [`ActorGroup`]. Each actor owns a FIFO mailbox and is guaranteed to
//! process messages one at a time, in send order, although successive batches can run on
//! different pool workers. Senders get a [`MsgFuture`] per message to observe completion,
//! failure or cancellation, optionally blocking on it with a timeout.
//!
//! Basic example:
//!```
//!  use hive_actor::prelude::*;
//!  # fn main ()->anyhow::Result<()> {
//!  let group = ActorGroup::new()?;
//!  let adder = Actor::new( &group, |(a,b): (i64,i64), _ctx: &mut ActorContext| Ok(a + b));
//!  let sum = adder.send( (40,2) )?.get( secs(5))?;
//!  assert_eq!( sum, 42);
//!  # group.stop( secs(1))?;
//!  # Ok(()) }
//!```
//!
//! Actors created with [`Actor::coalescing`] additionally collapse pending messages that map
//! to the same key, which bounds mailbox growth for high rate sources where only the latest
//! (or an aggregate) value matters.

use std::time::Duration;

pub mod errors;
pub mod future;
pub mod mailbox;
pub mod context;
pub mod group;
pub mod actor;

pub mod prelude;

pub use errors::{HiveActorError, Result};
pub use future::MsgFuture;
pub use mailbox::{CoalesceFn, CoalescingQueue, FifoQueue, KeyFn, MailQueue};
pub use context::ActorContext;
pub use group::{ActorGroup, GroupConfig};
pub use actor::{Actor, ReceiveFn};

/// max number of messages a single work-loop turn dispatches before the actor yields its
/// pool worker and re-registers itself
pub const DISPATCH_BATCH_LIMIT: usize = 100;

/// marker for types that can safely cross into an actor mailbox
pub trait SafeMessage: Send + 'static {}
impl <T: Send + 'static> SafeMessage for T {}

/* #region duration helpers ********************************************************************/

#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn micros (n: u64)->Duration { Duration::from_micros(n) }

/* #endregion duration helpers */
