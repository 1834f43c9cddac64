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

use std::{any::Any, collections::HashMap};

/// per-actor mutable local state, passed as an explicit `&mut` parameter to the receive
/// function for the duration of a dispatch. Since an actor is never executed by two workers
/// at a time receive code owns it exclusively - no thread-scoped lookup involved
pub struct ActorContext {
    locals: HashMap<String, Box<dyn Any + Send>>
}

impl ActorContext {
    pub(crate) fn new ()->Self {
        ActorContext { locals: HashMap::new() }
    }

    pub fn set <T: Send + 'static> (&mut self, key: impl Into<String>, value: T) {
        self.locals.insert( key.into(), Box::new(value));
    }

    pub fn get <T: 'static> (&self, key: &str)->Option<&T> {
        self.locals.get(key).and_then( |v| v.downcast_ref::<T>())
    }

    pub fn get_mut <T: 'static> (&mut self, key: &str)->Option<&mut T> {
        self.locals.get_mut(key).and_then( |v| v.downcast_mut::<T>())
    }

    pub fn remove <T: 'static> (&mut self, key: &str)->Option<T> {
        self.locals.remove(key).and_then( |v| v.downcast::<T>().ok()).map( |v| *v)
    }

    pub fn contains (&self, key: &str)->bool {
        self.locals.contains_key(key)
    }

    pub fn len (&self)->usize {
        self.locals.len()
    }

    pub fn is_empty (&self)->bool {
        self.locals.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_locals_roundtrip () {
        let mut ctx = ActorContext::new();
        assert!( ctx.is_empty());

        ctx.set( "count", 42u64);
        ctx.set( "name", "blah".to_string());

        assert_eq!( ctx.get::<u64>("count"), Some(&42));
        assert_eq!( ctx.get::<String>("name").map(|s| s.as_str()), Some("blah"));
        assert!( ctx.get::<u64>("name").is_none()); // wrong type
        assert!( ctx.get::<u64>("missing").is_none());
    }

    #[test]
    fn set_overwrites_and_remove_takes () {
        let mut ctx = ActorContext::new();
        ctx.set( "count", 1u64);
        ctx.set( "count", 2u64);

        *ctx.get_mut::<u64>("count").unwrap() += 1;
        assert_eq!( ctx.remove::<u64>("count"), Some(3));
        assert!( !ctx.contains("count"));
    }
}
