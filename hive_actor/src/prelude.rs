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

//! single-use-statement import for the common hive_actor types

pub use crate::actor::Actor;
pub use crate::context::ActorContext;
pub use crate::group::{ActorGroup, GroupConfig};
pub use crate::future::MsgFuture;
pub use crate::errors::{HiveActorError, Result};
pub use crate::{SafeMessage, DISPATCH_BATCH_LIMIT, secs, millis, micros};
