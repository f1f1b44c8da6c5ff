//! Event system for tournament and friendly notifications
//!
//! Services emit events as state changes. Interfaces subscribe to them to
//! refresh views or to tell followers what happened.
//!
//! The bus uses `tokio::sync::broadcast`, so any number of subscribers can
//! listen. With no subscribers, events are dropped. A lagging subscriber
//! misses the oldest events and never blocks an emitter.
//!
//! # Example
//!
//! ```no_run
//! use libgolazo::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::TournamentStarted {
//!     tournament_id: "abc123".to_string(),
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::Phase;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Event bus for distributing service events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus
    ///
    /// `capacity` is how many events each subscriber can buffer before the
    /// oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers without blocking
    pub fn emit(&self, event: Event) {
        tracing::debug!(event = event.kind(), "emit");
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Events emitted by services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A tournament was drawn and its opening fixture stored
    TournamentCreated {
        tournament_id: String,
        name: String,
        teams: usize,
        matches: usize,
    },

    TournamentStarted {
        tournament_id: String,
    },

    /// A match result was recorded or corrected
    ResultRecorded {
        tournament_id: String,
        match_id: String,
        home_team_id: String,
        away_team_id: String,
        home_goals: u32,
        away_goals: u32,
    },

    /// The tournament moved on to a new knockout round or phase
    PhaseAdvanced {
        tournament_id: String,
        phase: Phase,
        round: u32,
        /// Knockout stage name of the new round
        stage: Option<String>,
    },

    TournamentFinished {
        tournament_id: String,
        champion_id: Option<String>,
    },

    /// A friendly was offered to a team, directly or by requesting an
    /// availability
    FriendlyProposed {
        friendly_id: String,
        from_team_id: String,
        to_team_id: String,
    },

    FriendlyConfirmed {
        friendly_id: String,
        home_team_id: String,
        away_team_id: String,
    },

    FriendlyCancelled {
        friendly_id: String,
        /// Teams involved at the time of cancelling
        team_ids: Vec<String>,
    },
}

impl Event {
    /// Short name of the event, as used in the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TournamentCreated { .. } => "tournament_created",
            Event::TournamentStarted { .. } => "tournament_started",
            Event::ResultRecorded { .. } => "result_recorded",
            Event::PhaseAdvanced { .. } => "phase_advanced",
            Event::TournamentFinished { .. } => "tournament_finished",
            Event::FriendlyProposed { .. } => "friendly_proposed",
            Event::FriendlyConfirmed { .. } => "friendly_confirmed",
            Event::FriendlyCancelled { .. } => "friendly_cancelled",
        }
    }

    /// The tournament the event is about, if any
    pub fn tournament_id(&self) -> Option<&str> {
        match self {
            Event::TournamentCreated { tournament_id, .. }
            | Event::TournamentStarted { tournament_id }
            | Event::ResultRecorded { tournament_id, .. }
            | Event::PhaseAdvanced { tournament_id, .. }
            | Event::TournamentFinished { tournament_id, .. } => Some(tournament_id),
            _ => None,
        }
    }

    /// Teams whose coaches should hear about a friendly event
    pub fn team_ids(&self) -> Vec<&str> {
        match self {
            Event::FriendlyProposed { to_team_id, .. } => vec![to_team_id.as_str()],
            Event::FriendlyConfirmed {
                home_team_id,
                away_team_id,
                ..
            } => vec![home_team_id.as_str(), away_team_id.as_str()],
            Event::FriendlyCancelled { team_ids, .. } => {
                team_ids.iter().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }
}
