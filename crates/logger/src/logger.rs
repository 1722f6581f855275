// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr, Context, Handler};
use cc_events::{CycleEvent, Event, EventBus, Subscribe};
use std::marker::PhantomData;
use tracing::{error, info};

pub trait EventLogging: Event {
    fn log(&self, logger_name: &str);
}

/// Logs every event published on a bus.
pub struct SimpleLogger<E: EventLogging> {
    name: String,
    _p: PhantomData<E>,
}

impl<E: EventLogging> SimpleLogger<E> {
    pub fn attach(name: &str, bus: Addr<EventBus<E>>) -> Addr<Self> {
        let addr = Self {
            name: name.to_owned(),
            _p: PhantomData,
        }
        .start();
        bus.do_send(Subscribe::<E>::new("*", addr.clone().recipient()));
        info!(me = %name, "READY!");
        addr
    }
}

impl<E: EventLogging> Actor for SimpleLogger<E> {
    type Context = Context<Self>;
}

impl<E: EventLogging> Handler<E> for SimpleLogger<E> {
    type Result = ();

    fn handle(&mut self, msg: E, _: &mut Self::Context) -> Self::Result {
        msg.log(&self.name);
    }
}

impl EventLogging for CycleEvent {
    fn log(&self, logger_name: &str) {
        match self {
            CycleEvent::OperationFailed { data, .. } => {
                error!(me = logger_name, kind = ?data.err_type, "{}", data.message)
            }
            _ => match self.get_round_id() {
                Some(round) => {
                    info!(me = logger_name, evt = %self, round = %round, "Event Broadcasted")
                }
                None => info!(me = logger_name, evt = %self, "Event Broadcasted"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_events::{new_event_bus_with_history, GetEvents, RoundId, RoundStarted};

    #[actix::test]
    async fn logger_receives_every_event() -> anyhow::Result<()> {
        let (bus, history) = new_event_bus_with_history::<CycleEvent>();
        SimpleLogger::<CycleEvent>::attach("test", bus.clone());

        bus.send(CycleEvent::from(RoundStarted {
            round_id: RoundId(1),
            started_at: 0,
            previous: None,
        }))
        .await?;

        let events = history.send(GetEvents::new()).await?;
        assert_eq!(events.len(), 1);
        Ok(())
    }
}
