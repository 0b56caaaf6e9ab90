//! Satellite pass assembly from a rise / culminate / set event stream.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEventKind {
    Rise,
    Culminate,
    Set,
}

/// One event reported by a satellite tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassEvent {
    pub instant: DateTime<Utc>,
    pub kind: PassEventKind,
    /// Apparent altitude at `instant` (degrees)
    pub altitude: f64,
}

/// Represents a satellite pass fully contained in the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatellitePass {
    /// Time the satellite cleared the altitude threshold
    pub start_time: DateTime<Utc>,
    /// Maximum elevation reached during the pass (degrees)
    pub max_elevation: f64,
    /// Time the satellite dropped below the threshold
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum PassState {
    #[default]
    Idle,
    Armed {
        start_time: DateTime<Utc>,
        max_elevation: f64,
    },
}

/// Pairs rises with sets, discarding events outside an open pass.
#[derive(Debug, Default)]
pub struct PassStateMachine {
    state: PassState,
}

impl PassStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; returns a pass when a set closes one.
    pub fn feed(&mut self, event: &PassEvent) -> Option<SatellitePass> {
        match (self.state, event.kind) {
            // A rise always opens a fresh pass, even over an unfinished one.
            (_, PassEventKind::Rise) => {
                self.state = PassState::Armed {
                    start_time: event.instant,
                    max_elevation: event.altitude,
                };
                None
            }
            (
                PassState::Armed {
                    start_time,
                    max_elevation,
                },
                PassEventKind::Culminate,
            ) => {
                self.state = PassState::Armed {
                    start_time,
                    max_elevation: max_elevation.max(event.altitude),
                };
                None
            }
            (
                PassState::Armed {
                    start_time,
                    max_elevation,
                },
                PassEventKind::Set,
            ) => {
                self.state = PassState::Idle;
                Some(SatellitePass {
                    start_time,
                    max_elevation,
                    end_time: event.instant,
                })
            }
            (PassState::Idle, _) => {
                log::debug!("Discarding orphan {:?} at {}", event.kind, event.instant);
                None
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, PassState::Armed { .. })
    }
}

/// Run a whole event stream through the state machine.
///
/// A pass still open at the end of the stream is dropped.
pub fn assemble_passes(events: &[PassEvent]) -> Vec<SatellitePass> {
    let mut machine = PassStateMachine::new();
    let passes: Vec<SatellitePass> = events.iter().filter_map(|e| machine.feed(e)).collect();
    if machine.is_armed() {
        log::debug!("Dropping pass still in progress at window end");
    }
    passes
}
