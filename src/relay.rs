use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RelayError;
use crate::firebase::MessageSink;
use crate::line::webhook::{BeaconKind, Event, EventSource, EventType, MessageContent};
use crate::line::Messenger;

/// A webhook event reduced to what the relay acts on
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    GroupMessage {
        group_id: String,
        message: MessageContent,
    },
    UserMessage {
        reply_token: Option<String>,
        message: MessageContent,
    },
    Beacon {
        hwid: String,
        kind: BeaconKind,
    },
    Other {
        reason: String,
    },
}

impl RelayEvent {
    pub fn classify(event: Event) -> Self {
        match (event.event_type, event.source) {
            (EventType::Message, Some(EventSource::Group { group_id, user_id })) => {
                debug!("Group message in {} from {:?}", group_id, user_id);
                match event.message {
                    Some(message) => RelayEvent::GroupMessage { group_id, message },
                    None => RelayEvent::Other {
                        reason: format!("message event in {} without a message", group_id),
                    },
                }
            }
            (EventType::Message, Some(EventSource::User { user_id })) => {
                debug!("Direct message from {}", user_id);
                match event.message {
                    Some(message) => RelayEvent::UserMessage {
                        reply_token: event.reply_token,
                        message,
                    },
                    None => RelayEvent::Other {
                        reason: format!("message event from {} without a message", user_id),
                    },
                }
            }
            (EventType::Beacon, _) => match event.beacon {
                Some(beacon) => RelayEvent::Beacon {
                    hwid: beacon.hwid,
                    kind: beacon.kind,
                },
                None => RelayEvent::Other {
                    reason: "beacon event without beacon data".to_string(),
                },
            },
            (EventType::Message, Some(EventSource::Room { room_id, user_id })) => {
                RelayEvent::Other {
                    reason: format!("message in room {} from {:?}", room_id, user_id),
                }
            }
            (EventType::Message, _) => RelayEvent::Other {
                reason: "message from unknown source".to_string(),
            },
            (EventType::Other, _) => RelayEvent::Other {
                reason: "unhandled event type".to_string(),
            },
        }
    }
}

/// Acknowledgement sent back to a user who messaged the bot directly
pub fn acknowledgement(text: &str) -> String {
    format!("will convey: «{}»", text)
}

/// Routes voice messages to the group and webhook events to the sinks.
pub struct Relay {
    config: Arc<Config>,
    messenger: Arc<dyn Messenger>,
    sink: Arc<dyn MessageSink>,
}

impl Relay {
    pub fn new(
        config: Arc<Config>,
        messenger: Arc<dyn Messenger>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            config,
            messenger,
            sink,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Push a voice assistant utterance into the target group.
    pub async fn forward_voice_message(&self, text: &str) -> Result<(), RelayError> {
        info!("Voice message: {}", text);
        self.messenger
            .push_text(&self.config.line.group_id, text)
            .await
            .map_err(RelayError::Push)
    }

    /// Handle a batch in order. Every event is attempted even after a failure;
    /// the first failure is returned.
    pub async fn handle_events(&self, events: Vec<Event>) -> Result<(), RelayError> {
        let mut first_error = None;

        for (index, event) in events.into_iter().enumerate() {
            if let Err(e) = self.handle_event(RelayEvent::classify(event)).await {
                warn!("Event {} failed: {}", index, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn handle_event(&self, event: RelayEvent) -> Result<(), RelayError> {
        match event {
            RelayEvent::GroupMessage { group_id, message } => {
                if group_id != self.config.line.group_id {
                    debug!("Ignoring message from non-target group {}", group_id);
                    return Ok(());
                }
                self.handle_group_message(message).await
            }
            RelayEvent::UserMessage {
                reply_token,
                message,
            } => self.handle_user_message(reply_token, message).await,
            RelayEvent::Beacon { hwid, kind } => self.handle_beacon(&hwid, kind).await,
            RelayEvent::Other { reason } => {
                debug!("Got other event: {}", reason);
                Ok(())
            }
        }
    }

    async fn handle_group_message(&self, message: MessageContent) -> Result<(), RelayError> {
        match message {
            MessageContent::Text { id, text } => {
                debug!("Got text {}: {}", id, text);
                self.sink
                    .save_message(&text)
                    .await
                    .map_err(RelayError::Persist)
            }
            MessageContent::Other => {
                debug!("Got other format");
                Ok(())
            }
        }
    }

    async fn handle_user_message(
        &self,
        reply_token: Option<String>,
        message: MessageContent,
    ) -> Result<(), RelayError> {
        let text = match message {
            MessageContent::Text { text, .. } => text,
            MessageContent::Other => {
                debug!("Got other format from user");
                return Ok(());
            }
        };
        let Some(reply_token) = reply_token else {
            warn!("User message without reply token, dropping");
            return Ok(());
        };

        self.messenger
            .reply_text(&reply_token, &acknowledgement(&text))
            .await
            .map_err(RelayError::Reply)
    }

    async fn handle_beacon(&self, hwid: &str, kind: BeaconKind) -> Result<(), RelayError> {
        let Some(beacon) = self.config.beacon.as_ref() else {
            debug!("Beacon {} ignored, no beacon configured", hwid);
            return Ok(());
        };
        if beacon.hwid != hwid || kind != BeaconKind::Enter {
            debug!("Beacon {} ({:?}) ignored", hwid, kind);
            return Ok(());
        }

        info!("Beacon {} entered", hwid);
        self.sink
            .save_message(&beacon.greeting)
            .await
            .map_err(RelayError::Persist)
    }
}
