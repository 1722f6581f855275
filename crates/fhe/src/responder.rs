// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::RevealFulfiller;
use actix::prelude::*;
use cc_events::{
    CycleEvent, ErrorEvent, EventBus, FailureType, RequestId, RevealFulfilled, RevealRequested,
    Subscribe,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

/// Answers `RevealRequested` events on behalf of the ciphertext service, after an optional
/// delay, by publishing `RevealFulfilled` back onto the bus.
pub struct RevealResponder<F: RevealFulfiller> {
    fulfiller: F,
    bus: Addr<EventBus<CycleEvent>>,
    delay: Duration,
    /// Delayed responses that have not fired yet
    scheduled: HashMap<RequestId, SpawnHandle>,
}

impl<F: RevealFulfiller + Unpin> Actor for RevealResponder<F> {
    type Context = Context<Self>;
}

impl<F: RevealFulfiller + Unpin> RevealResponder<F> {
    pub fn new(bus: &Addr<EventBus<CycleEvent>>, fulfiller: F, delay: Duration) -> Self {
        Self {
            fulfiller,
            bus: bus.clone(),
            delay,
            scheduled: HashMap::new(),
        }
    }

    pub fn attach(bus: &Addr<EventBus<CycleEvent>>, fulfiller: F, delay: Duration) -> Addr<Self> {
        let addr = Self::new(bus, fulfiller, delay).start();
        bus.do_send(Subscribe::new("RevealRequested", addr.clone().recipient()));
        bus.do_send(Subscribe::new("Shutdown", addr.clone().recipient()));
        addr
    }

    fn respond(&mut self, request: RevealRequested) {
        match self.fulfiller.fulfil(request.request_id) {
            Ok((plaintext, proof)) => {
                info!(round = %request.round_id, request = %request.request_id, "reveal fulfilled");
                self.bus.do_send(CycleEvent::from(RevealFulfilled {
                    round_id: request.round_id,
                    request_id: request.request_id,
                    plaintext,
                    proof,
                }));
            }
            Err(err) => {
                error!(request = %request.request_id, "reveal failed: {}", err);
                self.bus
                    .do_send(CycleEvent::from_error(FailureType::Reveal, err));
            }
        }
    }
}

impl<F: RevealFulfiller + Unpin> Handler<CycleEvent> for RevealResponder<F> {
    type Result = ();

    fn handle(&mut self, msg: CycleEvent, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            CycleEvent::RevealRequested { data, .. } => {
                if self.delay.is_zero() {
                    self.respond(data);
                    return;
                }
                let request_id = data.request_id;
                let handle = ctx.run_later(self.delay, move |act, _| {
                    act.scheduled.remove(&data.request_id);
                    act.respond(data);
                });
                if let Some(previous) = self.scheduled.insert(request_id, handle) {
                    ctx.cancel_future(previous);
                }
            }
            CycleEvent::Shutdown { .. } => {
                info!("Killing RevealResponder");
                for (_, handle) in self.scheduled.drain() {
                    ctx.cancel_future(handle);
                }
                ctx.stop();
            }
            _ => (),
        }
    }
}
