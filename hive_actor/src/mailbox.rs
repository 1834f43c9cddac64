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
    collections::{HashMap, VecDeque},
    hash::Hash,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc
};
use tracing::warn;

use crate::future::MsgFuture;

/// computes the coalescing key of a pending message. `None` means the message does not
/// take part in coalescing
pub type KeyFn<M,K> = Arc<dyn Fn(&M)->Option<K> + Send + Sync>;

/// merges a new payload into an already pending one: (pending, incoming) -> merged.
/// Both arguments are borrowed so a panicking merge function loses neither message
pub type CoalesceFn<M> = Arc<dyn Fn(&M,&M)->M + Send + Sync>;

/// per-actor message queue capability. The base contract is a FIFO with O(1) append/remove;
/// `coalesce` lets a specialization collapse an incoming envelope into a pending one
/// (the base implementation always declines)
pub trait MailQueue<M,R>: Send {
    fn add (&mut self, env: MsgFuture<M,R>);
    fn get (&mut self)->Option<MsgFuture<M,R>>;

    /// try to merge `incoming` into an already pending envelope. Returns the pending
    /// envelope on a match (the caller must not append in that case), `None` otherwise
    fn coalesce (&mut self, _incoming: &MsgFuture<M,R>)->Option<MsgFuture<M,R>> { None }

    fn len (&self)->usize;
    fn is_empty (&self)->bool { self.len() == 0 }

    /// a fresh empty queue of the same kind - used by the kill protocol to swap out the
    /// live mailbox under the actor lock
    fn renew (&self)->Box<dyn MailQueue<M,R>>;
}

/* #region FifoQueue ***************************************************************************/

pub struct FifoQueue<M,R> {
    queue: VecDeque<MsgFuture<M,R>>
}

impl <M,R> FifoQueue<M,R> {
    pub fn new ()->Self {
        FifoQueue { queue: VecDeque::new() }
    }
}

impl <M,R> MailQueue<M,R> for FifoQueue<M,R> where M: Send + 'static, R: Send + 'static {
    fn add (&mut self, env: MsgFuture<M,R>) {
        self.queue.push_back(env);
    }

    fn get (&mut self)->Option<MsgFuture<M,R>> {
        self.queue.pop_front()
    }

    fn len (&self)->usize {
        self.queue.len()
    }

    fn renew (&self)->Box<dyn MailQueue<M,R>> {
        Box::new( FifoQueue::new())
    }
}

/* #endregion FifoQueue */

/* #region CoalescingQueue *********************************************************************/

/// FIFO queue specialization that de-duplicates pending (not yet dispatched) messages sharing
/// a key. The pending map holds one envelope clone per key exactly while that envelope is
/// resident. Without a key function coalescing is a no-op - distinct message values never
/// share an identity, so the caller has to opt in with an explicit key function
pub struct CoalescingQueue<M,R,K> {
    base: FifoQueue<M,R>,
    pending: HashMap<K,MsgFuture<M,R>>,
    to_key: Option<KeyFn<M,K>>,
    merge: Option<CoalesceFn<M>>
}

impl <M,R,K> CoalescingQueue<M,R,K>
    where M: Send + 'static, R: Send + 'static, K: Eq + Hash + Send + 'static
{
    pub fn new (to_key: Option<KeyFn<M,K>>, merge: Option<CoalesceFn<M>>)->Self {
        CoalescingQueue { base: FifoQueue::new(), pending: HashMap::new(), to_key, merge }
    }

    /// key computation is user code - a panic here is logged and treated as "no key"
    fn key_of (&self, env: &MsgFuture<M,R>)->Option<K> {
        let to_key = self.to_key.as_ref()?.clone();
        match env.with_payload( |msg| catch_unwind( AssertUnwindSafe( || to_key(msg)))) {
            Some(Ok(key)) => key,
            Some(Err(_)) => {
                warn!("coalescing key function panicked, message not coalesced");
                None
            }
            None => None // payload already taken
        }
    }
}

impl <M,R,K> MailQueue<M,R> for CoalescingQueue<M,R,K>
    where M: Send + 'static, R: Send + 'static, K: Eq + Hash + Send + 'static
{
    fn add (&mut self, env: MsgFuture<M,R>) {
        if let Some(key) = self.key_of(&env) {
            self.pending.insert( key, env.clone());
        }
        self.base.add(env);
    }

    fn get (&mut self)->Option<MsgFuture<M,R>> {
        let env = self.base.get()?;
        if let Some(key) = self.key_of(&env) {
            self.pending.remove(&key);
        }
        Some(env)
    }

    fn coalesce (&mut self, incoming: &MsgFuture<M,R>)->Option<MsgFuture<M,R>> {
        let key = self.key_of(incoming)?;
        let orig = self.pending.get(&key)?.clone();

        let merged = match &self.merge {
            Some(merge) => {
                let merge = merge.clone();
                let merged = orig.with_payload( |pending| {
                    incoming.with_payload( |new| catch_unwind( AssertUnwindSafe( || merge(pending,new))))
                }).flatten();

                match merged {
                    Some(Ok(msg)) => msg,
                    Some(Err(_)) => {
                        warn!("coalesce function panicked, message appended without coalescing");
                        return None
                    }
                    None => return None // a payload was already taken - nothing to merge
                }
            }
            None => incoming.take_payload()? // default: last write wins
        };

        orig.put_payload(merged);
        Some(orig) // note the original keeps its queue position
    }

    fn len (&self)->usize {
        self.base.len()
    }

    fn renew (&self)->Box<dyn MailQueue<M,R>> {
        Box::new( CoalescingQueue::new( self.to_key.clone(), self.merge.clone()))
    }
}

/* #endregion CoalescingQueue */


#[cfg(test)]
mod tests {
    use super::*;

    fn env (key: u32, val: u32)->MsgFuture<(u32,u32),u32> {
        MsgFuture::new((key,val))
    }

    fn payload (env: &MsgFuture<(u32,u32),u32>)->(u32,u32) {
        env.with_payload( |m| *m).unwrap()
    }

    fn coalescing_queue (merge: Option<CoalesceFn<(u32,u32)>>)->CoalescingQueue<(u32,u32),u32,u32> {
        CoalescingQueue::new( Some(Arc::new( |m: &(u32,u32)| Some(m.0))), merge)
    }

    #[test]
    fn fifo_preserves_send_order () {
        let mut q: FifoQueue<(u32,u32),u32> = FifoQueue::new();
        for i in 0..10 { q.add( env(i, i)); }

        assert_eq!( q.len(), 10);
        for i in 0..10 {
            assert_eq!( payload( &q.get().unwrap()), (i,i));
        }
        assert!( q.get().is_none());
        assert!( q.is_empty());
    }

    #[test]
    fn base_queue_declines_coalescing () {
        let mut q: FifoQueue<(u32,u32),u32> = FifoQueue::new();
        q.add( env(1, 10));
        assert!( q.coalesce( &env(1, 20)).is_none());
    }

    #[test]
    fn coalesce_merges_into_pending_envelope () {
        let merge: CoalesceFn<(u32,u32)> = Arc::new( |a,b| (a.0, a.1 + b.1));
        let mut q = coalescing_queue( Some(merge));

        let first = env(1, 10);
        q.add( first.clone());
        q.add( env(2, 5));

        let incoming = env(1, 32);
        let hit = q.coalesce(&incoming).expect("expected a coalescing match");

        assert_eq!( q.len(), 2); // queue did not grow
        assert_eq!( payload(&hit), (1,42));
        assert_eq!( payload( &q.get().unwrap()), (1,42)); // original queue position preserved
        assert_eq!( payload( &q.get().unwrap()), (2,5));
    }

    #[test]
    fn default_merge_is_last_write_wins () {
        let mut q = coalescing_queue(None);

        q.add( env(1, 10));
        let hit = q.coalesce( &env(1, 99)).expect("expected a coalescing match");
        assert_eq!( payload(&hit), (1,99));
    }

    #[test]
    fn dequeue_removes_pending_entry () {
        let mut q = coalescing_queue(None);

        q.add( env(1, 10));
        q.get().unwrap();

        // the key is gone - a new message with the same key must not match
        assert!( q.coalesce( &env(1, 20)).is_none());
    }

    #[test]
    fn unrelated_keys_do_not_match () {
        let mut q = coalescing_queue(None);
        q.add( env(1, 10));
        assert!( q.coalesce( &env(2, 20)).is_none());
    }

    #[test]
    fn no_key_function_disables_coalescing () {
        let mut q: CoalescingQueue<(u32,u32),u32,u32> = CoalescingQueue::new( None, None);
        q.add( env(1, 10));
        assert!( q.coalesce( &env(1, 20)).is_none());
        assert_eq!( q.len(), 1);
    }

    #[test]
    fn panicking_key_function_falls_back_to_plain_enqueue () {
        let to_key: KeyFn<(u32,u32),u32> = Arc::new( |m| if m.1 == 13 { panic!("bad key") } else { Some(m.0) });
        let mut q: CoalescingQueue<(u32,u32),u32,u32> = CoalescingQueue::new( Some(to_key), None);

        q.add( env(1, 13)); // key fn panics - appended without a pending entry
        assert_eq!( q.len(), 1);
        assert!( q.coalesce( &env(1, 10)).is_none());
    }

    #[test]
    fn panicking_merge_function_falls_back_to_plain_enqueue () {
        let merge: CoalesceFn<(u32,u32)> = Arc::new( |_,_| panic!("bad merge"));
        let mut q = coalescing_queue( Some(merge));

        let first = env(1, 10);
        q.add( first.clone());

        let incoming = env(1, 32);
        assert!( q.coalesce(&incoming).is_none());
        assert_eq!( payload(&first), (1,10));      // pending payload untouched
        assert_eq!( payload(&incoming), (1,32));   // incoming payload intact, caller appends it
    }

    #[test]
    fn renew_yields_empty_queue_of_same_kind () {
        let mut q = coalescing_queue(None);
        q.add( env(1, 10));

        let mut fresh = q.renew();
        assert!( fresh.is_empty());

        fresh.add( env(1, 1));
        assert!( fresh.coalesce( &env(1, 2)).is_some()); // still a coalescing queue
    }
}
