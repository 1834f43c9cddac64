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

use hive_actor::prelude::*;

fn main ()->anyhow::Result<()> {
    let group = ActorGroup::new()?;

    let greeter = Actor::new( &group, |name: String, ctx: &mut ActorContext| {
        let count = ctx.get::<u64>("count").copied().unwrap_or(0) + 1;
        ctx.set( "count", count);
        Ok( format!("hello {name} (greeting #{count})"))
    });

    for name in ["world", "hive", "again world"] {
        let reply = greeter.send( name.to_string())?.get( secs(1))?;
        println!("{reply}");
    }

    group.stop( secs(1))?;
    Ok(())
}
