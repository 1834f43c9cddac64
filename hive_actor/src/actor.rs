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
    any::Any,
    hash::Hash,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex, MutexGuard},
    time::Duration
};
use anyhow::anyhow;
use tracing::warn;

use crate::{
    context::ActorContext,
    errors::{poisoned_lock, HiveActorError, Result},
    future::MsgFuture,
    group::ActorGroup,
    mailbox::{CoalesceFn, CoalescingQueue, FifoQueue, KeyFn, MailQueue},
    DISPATCH_BATCH_LIMIT
};

/// user supplied receive logic. A failure lands in the message's error slot, it never
/// escapes the pool worker
pub type ReceiveFn<M,R> = Arc<dyn Fn(M, &mut ActorContext)->anyhow::Result<R> + Send + Sync>;

/// mailbox pointers, coalescing bookkeeping and the admission flag share one lock - the
/// critical sections are short and never cover a receive invocation
struct MailState<M,R> {
    queue: Box<dyn MailQueue<M,R>>,

    /// true iff the actor is currently submitted to the pool or mid work-loop. This is the
    /// sole submission condition, which keeps the actor registered at most once no matter
    /// how many sends race the enqueue
    submitted: bool
}

struct ActorInner<M,R> {
    group: ActorGroup,
    receive: Option<ReceiveFn<M,R>>,
    mail: Mutex<MailState<M,R>>,
    context: Mutex<ActorContext>,
    work_cycles: AtomicU64,
    processed: AtomicU64
}

/// a single-mailbox, single-flight message processor sharing its group's worker pool.
///
/// Messages are delivered to the receive function strictly one at a time, in send order for
/// immediate sends, even though successive work-loop turns may run on different physical
/// workers. Actor is a cheap-clone handle - clones share mailbox and state.
pub struct Actor<M,R> {
    inner: Arc<ActorInner<M,R>>
}

impl <M,R> Clone for Actor<M,R> {
    fn clone (&self)->Self {
        Actor { inner: self.inner.clone() }
    }
}

impl <M,R> Actor<M,R> where M: Send + 'static, R: Send + 'static {

    pub fn new (group: &ActorGroup, receive: impl Fn(M,&mut ActorContext)->anyhow::Result<R> + Send + Sync + 'static)->Self {
        Self::from_parts( group, Some(Arc::new(receive)), Box::new( FifoQueue::new()))
    }

    /// coalescing actor: pending messages mapping to the same key are merged into the
    /// earliest pending envelope instead of growing the mailbox. `merge` defaults to
    /// last-write-wins when `None`
    pub fn coalescing <K> (
        group: &ActorGroup,
        to_key: impl Fn(&M)->Option<K> + Send + Sync + 'static,
        merge: Option<CoalesceFn<M>>,
        receive: impl Fn(M,&mut ActorContext)->anyhow::Result<R> + Send + Sync + 'static
    )->Self
        where K: Eq + Hash + Send + 'static
    {
        let queue = CoalescingQueue::new( Some(Arc::new(to_key) as KeyFn<M,K>), merge);
        Self::from_parts( group, Some(Arc::new(receive)), Box::new(queue))
    }

    /// an actor without receive logic - every dispatched message is answered with an error
    /// and a warning is logged. This is a misconfiguration signal for wiring phases, not a
    /// crash (see the dispatch contract)
    pub fn without_receive (group: &ActorGroup)->Self {
        Self::from_parts( group, None, Box::new( FifoQueue::new()))
    }

    fn from_parts (group: &ActorGroup, receive: Option<ReceiveFn<M,R>>, queue: Box<dyn MailQueue<M,R>>)->Self {
        Actor {
            inner: Arc::new( ActorInner {
                group: group.clone(),
                receive,
                mail: Mutex::new( MailState { queue, submitted: false }),
                context: Mutex::new( ActorContext::new()),
                work_cycles: AtomicU64::new(0),
                processed: AtomicU64::new(0)
            })
        }
    }

    pub fn group (&self)->&ActorGroup {
        &self.inner.group
    }

    /* #region send variants ***********************************************************************/

    /// immediate enqueue. Returns the message's future, or the pending envelope the message
    /// got coalesced into
    pub fn send (&self, msg: M)->Result<MsgFuture<M,R>> {
        if self.inner.group.is_stopped() { return Err(HiveActorError::GroupStopped) }
        self.enqueue( MsgFuture::new(msg), true)
    }

    /// enqueue once `delay` elapsed, via the group's scheduler. The message enters the FIFO
    /// only at that point, so its order relative to concurrently sent immediate messages is
    /// not guaranteed
    pub fn send_later (&self, delay: Duration, msg: M)->Result<MsgFuture<M,R>> {
        if self.inner.group.is_stopped() { return Err(HiveActorError::GroupStopped) }

        let env = MsgFuture::new(msg);
        let actor = self.clone();
        let mut pending = Some(env.clone());

        self.inner.group.schedule( delay, move || {
            if let Some(env) = pending.take() {
                // the envelope was already handed to the sender - no coalescing
                if let Err(e) = actor.enqueue( env, false) {
                    warn!("delayed enqueue failed: {e}");
                }
            }
        })?;

        Ok(env)
    }

    /// enqueue once `prereq` reached a terminal state (immediately if it already has)
    pub fn send_when_done <M2,R2> (&self, prereq: &MsgFuture<M2,R2>, msg: M)->Result<MsgFuture<M,R>>
        where M2: Send + 'static, R2: Send + 'static
    {
        if self.inner.group.is_stopped() { return Err(HiveActorError::GroupStopped) }

        let env = MsgFuture::new(msg);
        let actor = self.clone();
        let queued = env.clone();

        prereq.when_done( move || {
            if let Err(e) = actor.enqueue( queued, false) {
                warn!("when-done enqueue failed: {e}");
            }
        });

        Ok(env)
    }

    fn enqueue (&self, env: MsgFuture<M,R>, coalesce: bool)->Result<MsgFuture<M,R>> {
        let mut mail = self.inner.mail.lock().map_err( |_| poisoned_lock("actor mailbox"))?;

        // attempt to coalesce
        if coalesce {
            if let Some(orig) = mail.queue.coalesce(&env) {
                return Ok(orig)
            }
        }

        mail.queue.add( env.clone());

        // submit to the pool if not submitted or currently running
        if !mail.submitted {
            mail.submitted = true;
            let actor = self.clone();
            self.inner.group.submit( move || actor.work());
        }

        Ok(env)
    }

    /* #endregion send variants */

    /* #region work-loop and dispatch **************************************************************/

    /// one pool-licensed turn over the mailbox: drain up to [`DISPATCH_BATCH_LIMIT`] messages,
    /// then either clear the admission flag or re-register with the pool so a busy actor
    /// yields its worker instead of monopolizing it
    fn work (&self) {
        self.inner.work_cycles.fetch_add( 1, Ordering::Relaxed);

        for _ in 0..DISPATCH_BATCH_LIMIT {
            // get next message, or if none pending we are done
            let env = { self.lock_mail().queue.get() };
            let Some(env) = env else { break };

            self.dispatch(env); // outside the lock
            self.inner.processed.fetch_add( 1, Ordering::Relaxed);
        }

        // done dispatching - either clear the admission flag or resubmit to the pool
        let mut mail = self.lock_mail();
        if mail.queue.is_empty() {
            mail.submitted = false;
        } else {
            mail.submitted = true;
            let actor = self.clone();
            self.inner.group.submit( move || actor.work());
        }
    }

    fn dispatch (&self, env: MsgFuture<M,R>) {
        if env.is_cancelled() { return }
        if self.inner.group.is_killed() { env.cancel(); return }

        let Some(msg) = env.take_payload() else { return };

        let Some(receive) = &self.inner.receive else {
            warn!("actor has no receive function, message dropped");
            env.err( anyhow!("no receive function"));
            return
        };

        let outcome = {
            let receive = receive.clone();
            let mut context = self.inner.context.lock().unwrap_or_else( |p| p.into_inner());
            catch_unwind( AssertUnwindSafe( || receive( msg, &mut context)))
        };

        match outcome {
            Ok(Ok(value)) => env.set(value),
            Ok(Err(e)) => env.err(e),
            Err(panic) => env.err( anyhow!("receive panicked: {}", panic_message(&*panic)))
        }
    }

    /* #endregion work-loop and dispatch */

    /// swap in a fresh mailbox and cancel every resident envelope - none of them reach the
    /// receive function. The actor stays usable, subsequent sends succeed unless the group
    /// itself is stopped
    pub fn kill (&self) {
        let mut old = {
            let mut mail = self.lock_mail();
            let fresh = mail.queue.renew();
            std::mem::replace( &mut mail.queue, fresh)
        };

        // outside the lock - concurrent sends already target the new mailbox
        while let Some(env) = old.get() {
            env.cancel();
        }
    }

    //--- introspection (mostly for tests and monitoring)

    /// number of messages currently resident in the mailbox
    pub fn pending_count (&self)->usize {
        self.lock_mail().queue.len()
    }

    /// number of work-loop turns executed so far
    pub fn work_cycles (&self)->u64 {
        self.inner.work_cycles.load(Ordering::Relaxed)
    }

    /// number of messages dispatched so far (including cancelled ones)
    pub fn processed_count (&self)->u64 {
        self.inner.processed.load(Ordering::Relaxed)
    }

    /// access the actor locals outside of a dispatch (e.g. to seed them before first send).
    /// Note this briefly contends with a running dispatch
    pub fn with_context <T> (&self, f: impl FnOnce(&mut ActorContext)->T)->T {
        let mut context = self.inner.context.lock().unwrap_or_else( |p| p.into_inner());
        f( &mut context)
    }

    fn lock_mail (&self)->MutexGuard<'_,MailState<M,R>> {
        // our own critical sections don't panic mid-update, so recovery is safe
        self.inner.mail.lock().unwrap_or_else( |p| p.into_inner())
    }
}

fn panic_message (panic: &(dyn Any + Send))->String {
    if let Some(s) = panic.downcast_ref::<&str>() { (*s).to_string() }
    else if let Some(s) = panic.downcast_ref::<String>() { s.clone() }
    else { "unknown panic".to_string() }
}
