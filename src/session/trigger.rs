//! Phase triggers.
//!
//! A trigger ties an RDO member name to the session phase that a
//! successful call of that member enters, for example `Logon` entering
//! `directory_connected`. Triggers are declared in fixture files and
//! evaluated by the mock server after every matched command.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::{RdoPacket, strip_quotes};

use super::state::{MockSession, PhaseTransition, SessionPhase};

/// Leading sigils RDO uses to tag argument types.
const TYPE_MARKERS: [char; 4] = ['%', '#', '$', '^'];

/// A fixture-declared phase trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseTrigger {
    /// Member name whose successful match fires the trigger.
    pub member: String,
    /// Phase entered when the trigger fires.
    pub phase: SessionPhase,
    /// Zero-based argument index to record as the phase's value.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "captureArg")]
    pub capture_arg: Option<usize>,
}

impl PhaseTrigger {
    /// Creates a trigger without argument capture.
    #[must_use]
    pub fn new(member: impl Into<String>, phase: SessionPhase) -> Self {
        Self {
            member: member.into(),
            phase,
            capture_arg: None,
        }
    }

    /// Captures argument `index` when the trigger fires.
    #[must_use]
    pub const fn capturing(mut self, index: usize) -> Self {
        self.capture_arg = Some(index);
        self
    }

    /// Extracts the captured value from `packet`, if configured and present.
    #[must_use]
    pub fn captured_value<'a>(&self, packet: &'a RdoPacket) -> Option<&'a str> {
        let raw = packet.args.get(self.capture_arg?)?;
        let value = strip_quotes(raw);
        Some(value.strip_prefix(TYPE_MARKERS).unwrap_or(value))
    }
}

/// Result of evaluating triggers against a matched packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    /// The session advanced.
    Fired(PhaseTransition),
    /// No trigger applied.
    NotMet,
}

/// Applies the first trigger that names the packet's member and targets
/// the session's next phase.
///
/// Triggers for any other phase are ignored, so a replayed login after the
/// session has moved on leaves the phase untouched.
pub fn evaluate(
    triggers: &[PhaseTrigger],
    session: &mut MockSession,
    packet: &RdoPacket,
) -> TriggerResult {
    let member = packet.member_name();
    let Some(next) = session.phase().next() else {
        return TriggerResult::NotMet;
    };

    let mut named = triggers.iter().filter(|t| t.member == member).peekable();
    if named.peek().is_none() {
        return TriggerResult::NotMet;
    }

    let Some(trigger) = named.find(|t| t.phase == next) else {
        debug!(
            member,
            phase = %session.phase(),
            "trigger member matched outside its phase, ignoring"
        );
        return TriggerResult::NotMet;
    };

    match session.advance_to(next) {
        Ok(transition) => {
            if let Some(value) = trigger.captured_value(packet) {
                session.record_value(next, value);
            }
            TriggerResult::Fired(transition)
        }
        Err(e) => {
            debug!(error = %e, "trigger transition rejected");
            TriggerResult::NotMet
        }
    }
}
