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

/// delayed and chained sends: a reminder fires after its delay, and a followup message is
/// only enqueued once the reminder has been processed

use hive_actor::prelude::*;

fn main ()->anyhow::Result<()> {
    let group = ActorGroup::new()?;

    let printer = Actor::new( &group, |msg: String, _ctx: &mut ActorContext| {
        println!("{msg}");
        Ok(())
    });

    let reminder = printer.send_later( millis(500), "ding - half a second is up".to_string())?;
    printer.send( "waiting for the reminder...".to_string())?;

    let followup = printer.send_when_done( &reminder, "...and this one ran after it".to_string())?;
    followup.get( secs(2))?;

    group.stop( secs(1))?;
    Ok(())
}
