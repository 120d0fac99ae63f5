use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{BonusAwardedEvent, BonusUnlockedEvent, EventHandler, EventProducer, Handler};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub bonus_awarded_producer: Vec<EventProducer<BonusAwardedEvent>>,
    pub bonus_unlocked_producer: Vec<EventProducer<BonusUnlockedEvent>>,
}

pub struct EventHandlers {
    pub on_bonus_awarded: Option<EventHandler<BonusAwardedEvent>>,
    pub on_bonus_unlocked: Option<EventHandler<BonusUnlockedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_bonus_awarded = hooks.on_bonus_awarded.map(|f| EventHandler::new(buffer_size, f));
        let on_bonus_unlocked = hooks.on_bonus_unlocked.map(|f| EventHandler::new(buffer_size, f));
        Self { on_bonus_awarded, on_bonus_unlocked }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_bonus_awarded {
            result.bonus_awarded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_bonus_unlocked {
            result.bonus_unlocked_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_bonus_awarded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_bonus_unlocked {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_bonus_awarded: Option<Handler<BonusAwardedEvent>>,
    pub on_bonus_unlocked: Option<Handler<BonusUnlockedEvent>>,
}

impl EventHooks {
    pub fn on_bonus_awarded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BonusAwardedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_bonus_awarded = Some(Arc::new(f));
        self
    }

    pub fn on_bonus_unlocked<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BonusUnlockedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_bonus_unlocked = Some(Arc::new(f));
        self
    }
}
