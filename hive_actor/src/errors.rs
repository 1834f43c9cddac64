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

use thiserror::Error;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, HiveActorError>;

#[derive(Error,Debug)]
pub enum HiveActorError {

    #[error("actor group is stopped")]
    GroupStopped,

    #[error("message result already consumed")]
    ResultConsumed,

    #[error("message result still pending")]
    ResultPending,

    #[error("message cancelled")]
    MessageCancelled,

    #[error("timeout error: {0:?}")]
    TimeoutError(Duration),

    #[error("receive failed: {0}")]
    ReceiveFailed(anyhow::Error),

    #[error("schedule failed: {0}")]
    ScheduleFailed(String),

    #[error("config parse error {0}")]
    ConfigParseError(String),

    #[error("poisoned lock error {0}")]
    PoisonedLockError(String),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    //... and more to come
}

pub fn receive_failed (e: anyhow::Error)->HiveActorError {
    HiveActorError::ReceiveFailed(e)
}

pub fn schedule_failed <T: ToString> (op: T)->HiveActorError {
    HiveActorError::ScheduleFailed(op.to_string())
}

pub fn poisoned_lock <T: ToString> (op: T)->HiveActorError {
    HiveActorError::PoisonedLockError(op.to_string())
}
