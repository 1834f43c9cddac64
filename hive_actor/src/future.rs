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
    fmt::Debug,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant}
};
use crate::errors::{HiveActorError, Result};

type WhenDoneFn = Box<dyn FnOnce() + Send>;

/// terminal state slot of a [`MsgFuture`]. Once a terminal variant is reached no further
/// transitions are possible - set/err/cancel all turn into no-ops
enum Outcome<R> {
    Pending,
    Done(Option<R>),         // inner Option so the value can be taken exactly once
    Failed(Option<anyhow::Error>),
    Cancelled
}

impl <R> Outcome<R> {
    fn is_terminal (&self)->bool {
        !matches!( self, Outcome::Pending)
    }
}

struct FutureState<M,R> {
    payload: Option<M>,        // the message, taken at dispatch time
    outcome: Outcome<R>,
    when_done: Vec<WhenDoneFn> // continuations fired once upon the terminal transition
}

struct FutureInner<M,R> {
    state: Mutex<FutureState<M,R>>,
    done: Condvar
}

/// the message envelope: combines a payload with its asynchronous result/error/cancel slot.
/// One is created per send and handed back to the sender; the actor's mailbox holds a clone
/// while the message is pending. All clones share the same state.
///
/// A sender observes the result with [`MsgFuture::get`] (blocking, with timeout) or
/// [`MsgFuture::try_get`]; the result value can be taken exactly once.
pub struct MsgFuture<M,R> {
    inner: Arc<FutureInner<M,R>>
}

impl <M,R> Clone for MsgFuture<M,R> {
    fn clone (&self)->Self {
        MsgFuture { inner: self.inner.clone() }
    }
}

impl <M,R> Debug for MsgFuture<M,R> where M: Send + 'static, R: Send + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        let tag = match state.outcome {
            Outcome::Pending => "pending",
            Outcome::Done(_) => "done",
            Outcome::Failed(_) => "failed",
            Outcome::Cancelled => "cancelled"
        };
        write!(f, "MsgFuture({})", tag)
    }
}

impl <M,R> MsgFuture<M,R> where M: Send + 'static, R: Send + 'static {

    pub(crate) fn new (msg: M)->Self {
        MsgFuture {
            inner: Arc::new( FutureInner {
                state: Mutex::new( FutureState { payload: Some(msg), outcome: Outcome::Pending, when_done: Vec::new() }),
                done: Condvar::new()
            })
        }
    }

    /// complete with the receive function's result. No-op if already terminal
    pub fn set (&self, value: R) {
        self.transition( |state| state.outcome = Outcome::Done(Some(value)));
    }

    /// attach a failure raised by the receive function. No-op if already terminal
    pub fn err (&self, e: anyhow::Error) {
        self.transition( |state| state.outcome = Outcome::Failed(Some(e)));
    }

    /// cancel the message. No-op if already terminal. Note this is only observed best-effort
    /// at dispatch time - a dispatch that already passed its cancel check still delivers
    pub fn cancel (&self) {
        self.transition( |state| state.outcome = Outcome::Cancelled);
    }

    pub fn is_cancelled (&self)->bool {
        matches!( self.lock_state().outcome, Outcome::Cancelled)
    }

    /// true once the future reached any terminal state (completed, failed or cancelled)
    pub fn is_complete (&self)->bool {
        self.lock_state().outcome.is_terminal()
    }

    /// non-blocking result check. Returns `ResultPending` while no terminal state was reached
    pub fn try_get (&self)->Result<R> {
        let mut state = self.lock_state();
        if state.outcome.is_terminal() { take_outcome( &mut state) } else { Err(HiveActorError::ResultPending) }
    }

    /// block the calling thread until the future reaches a terminal state or `to` elapses.
    /// Do not call this from within a receive function - it would stall a pool worker
    pub fn get (&self, to: Duration)->Result<R> {
        let deadline = Instant::now() + to;
        let mut state = self.lock_state();

        loop {
            if state.outcome.is_terminal() { return take_outcome( &mut state) }

            let now = Instant::now();
            if now >= deadline { return Err(HiveActorError::TimeoutError(to)) }

            let (guard,_) = self.inner.done.wait_timeout( state, deadline - now)
                .unwrap_or_else( |p| p.into_inner());
            state = guard;
        }
    }

    /// register a continuation that fires exactly once when the future reaches a terminal
    /// state (immediately if it already has). Continuations run outside the state lock, so
    /// they are free to enqueue messages on any actor
    pub fn when_done (&self, f: impl FnOnce() + Send + 'static) {
        let mut pending: Option<WhenDoneFn> = Some(Box::new(f));
        {
            let mut state = self.lock_state();
            if !state.outcome.is_terminal() {
                state.when_done.push( pending.take().unwrap());
            }
        }
        if let Some(f) = pending { f() }
    }

    //--- payload accessors for mailbox bookkeeping and dispatch

    pub(crate) fn take_payload (&self)->Option<M> {
        self.lock_state().payload.take()
    }

    pub(crate) fn put_payload (&self, msg: M) {
        self.lock_state().payload = Some(msg);
    }

    pub(crate) fn with_payload <T> (&self, f: impl FnOnce(&M)->T)->Option<T> {
        self.lock_state().payload.as_ref().map(f)
    }

    //--- internals

    /// perform the terminal transition and fire continuations after releasing the lock
    fn transition (&self, apply: impl FnOnce(&mut FutureState<M,R>)) {
        let continuations = {
            let mut state = self.lock_state();
            if state.outcome.is_terminal() { return }
            apply( &mut state);
            self.inner.done.notify_all();
            std::mem::take( &mut state.when_done)
        };
        for f in continuations { f() }
    }

    fn lock_state (&self)->MutexGuard<'_,FutureState<M,R>> {
        // a panic while holding this lock cannot leave the state inconsistent - recover
        self.inner.state.lock().unwrap_or_else( |p| p.into_inner())
    }
}

fn take_outcome <M,R> (state: &mut FutureState<M,R>)->Result<R> {
    match &mut state.outcome {
        Outcome::Done(value) => value.take().ok_or(HiveActorError::ResultConsumed),
        Outcome::Failed(e) => Err( e.take().map(HiveActorError::ReceiveFailed).unwrap_or(HiveActorError::ResultConsumed)),
        Outcome::Cancelled => Err(HiveActorError::MessageCancelled),
        Outcome::Pending => Err(HiveActorError::ResultPending)
    }
}
