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

/// high rate sensor updates where only the latest value per channel matters. The coalescing
/// mailbox keeps at most one pending message per channel no matter how fast the source sends

use std::{thread, time::Duration};
use hive_actor::prelude::*;

#[derive(Clone,Debug)]
struct Update { channel: u16, value: f64 }

fn main ()->anyhow::Result<()> {
    let group = ActorGroup::new()?;

    let sink = Actor::coalescing(
        &group,
        |update: &Update| Some(update.channel),
        None, // last write wins
        |update: Update, _ctx: &mut ActorContext| {
            println!("channel {} -> {}", update.channel, update.value);
            thread::sleep( millis(5)); // a slow consumer
            Ok(())
        }
    );

    // burst of updates - most per-channel values get superseded before dispatch
    let mut last = None;
    for n in 0..1000u32 {
        let update = Update { channel: (n % 4) as u16, value: n as f64 };
        last = Some( sink.send(update)?);
    }

    last.unwrap().get( secs(5))?;
    println!("pending after burst: {}", sink.pending_count());

    group.stop( secs(1))?;
    Ok(())
}
