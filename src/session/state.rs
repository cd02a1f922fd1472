//! Session phase state.
//!
//! A coarse, forward-only state machine describing how far a simulated
//! client has progressed through the login flow. The matcher never reads
//! it; the mock server advances it and reports it alongside replies.
//!
//! There is no regression transition. A new connection constructs a fresh
//! [`MockSession`] instead.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PhaseError;

/// Phases of a client session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No login has happened yet.
    #[default]
    Disconnected,
    /// Logged in to the directory server.
    DirectoryConnected,
    /// Logged in to a world server.
    WorldConnected,
    /// A company has been selected.
    CompanySelected,
    /// The client entered the game view.
    InGame,
}

impl SessionPhase {
    /// Every phase in transition order.
    pub const ALL: [Self; 5] = [
        Self::Disconnected,
        Self::DirectoryConnected,
        Self::WorldConnected,
        Self::CompanySelected,
        Self::InGame,
    ];

    /// Snake-case name, as used in fixtures and replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::DirectoryConnected => "directory_connected",
            Self::WorldConnected => "world_connected",
            Self::CompanySelected => "company_selected",
            Self::InGame => "in_game",
        }
    }

    /// The phase one step forward, or `None` from [`SessionPhase::InGame`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Disconnected => Some(Self::DirectoryConnected),
            Self::DirectoryConnected => Some(Self::WorldConnected),
            Self::WorldConnected => Some(Self::CompanySelected),
            Self::CompanySelected => Some(Self::InGame),
            Self::InGame => None,
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionPhase {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| PhaseError::Unknown(s.to_string()))
    }
}

/// Record of a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    /// Phase before the transition
    pub from: SessionPhase,
    /// Phase after the transition
    pub to: SessionPhase,
}

/// State of one simulated client session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MockSession {
    phase: SessionPhase,
    current_world: Option<String>,
    current_company: Option<String>,
    username: Option<String>,
}

impl MockSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// World the client logged in to, once known.
    #[must_use]
    pub fn current_world(&self) -> Option<&str> {
        self.current_world.as_deref()
    }

    /// Company the client selected, once known.
    #[must_use]
    pub fn current_company(&self) -> Option<&str> {
        self.current_company.as_deref()
    }

    /// Directory login name, once known.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Moves to `to`, which must be exactly one step forward.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidTransition`] for a skip, a repeat or a
    /// regression.
    pub fn advance_to(&mut self, to: SessionPhase) -> Result<PhaseTransition, PhaseError> {
        if self.phase.next() != Some(to) {
            return Err(PhaseError::InvalidTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            });
        }
        let transition = PhaseTransition {
            from: self.phase,
            to,
        };
        self.phase = to;
        Ok(transition)
    }

    /// Stores `value` in the field that becomes known on entering `phase`.
    ///
    /// Phases without an associated field ignore the value.
    pub fn record_value(&mut self, phase: SessionPhase, value: impl Into<String>) {
        let slot = match phase {
            SessionPhase::DirectoryConnected => &mut self.username,
            SessionPhase::WorldConnected => &mut self.current_world,
            SessionPhase::CompanySelected => &mut self.current_company,
            SessionPhase::Disconnected | SessionPhase::InGame => return,
        };
        *slot = Some(value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_disconnected() {
        let session = MockSession::new();
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert!(session.username().is_none());
        assert!(session.current_world().is_none());
        assert!(session.current_company().is_none());
    }

    #[test]
    fn test_full_login_flow() {
        let mut session = MockSession::new();
        for (phase, value) in [
            (SessionPhase::DirectoryConnected, "alice"),
            (SessionPhase::WorldConnected, "Shamba"),
            (SessionPhase::CompanySelected, "Acme"),
        ] {
            session.advance_to(phase).unwrap();
            session.record_value(phase, value);
        }
        let last = session.advance_to(SessionPhase::InGame).unwrap();

        assert_eq!(last.from, SessionPhase::CompanySelected);
        assert_eq!(session.phase(), SessionPhase::InGame);
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(session.current_world(), Some("Shamba"));
        assert_eq!(session.current_company(), Some("Acme"));
    }

    #[test]
    fn test_skip_is_rejected() {
        let mut session = MockSession::new();
        let err = session.advance_to(SessionPhase::WorldConnected).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: "disconnected".to_string(),
                to: "world_connected".to_string(),
            }
        );
        assert_eq!(session.phase(), SessionPhase::Disconnected);
    }

    #[test]
    fn test_repeat_and_regression_rejected() {
        let mut session = MockSession::new();
        session.advance_to(SessionPhase::DirectoryConnected).unwrap();
        assert!(session.advance_to(SessionPhase::DirectoryConnected).is_err());
        assert!(session.advance_to(SessionPhase::Disconnected).is_err());
        assert_eq!(session.phase(), SessionPhase::DirectoryConnected);
    }

    #[test]
    fn test_in_game_is_last() {
        assert_eq!(SessionPhase::InGame.next(), None);
        let mut session = MockSession::new();
        for phase in &SessionPhase::ALL[1..] {
            session.advance_to(*phase).unwrap();
        }
        assert!(session.advance_to(SessionPhase::InGame).is_err());
    }

    #[test]
    fn test_phase_order() {
        assert!(SessionPhase::Disconnected < SessionPhase::InGame);
        let mut phase = SessionPhase::Disconnected;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen, SessionPhase::ALL.to_vec());
    }

    #[test]
    fn test_phase_from_str() {
        for phase in SessionPhase::ALL {
            assert_eq!(phase.as_str().parse::<SessionPhase>().unwrap(), phase);
        }
        assert!(matches!(
            "lobby".parse::<SessionPhase>(),
            Err(PhaseError::Unknown(_))
        ));
    }

    #[test]
    fn test_record_value_slots() {
        let mut session = MockSession::new();
        session.record_value(SessionPhase::WorldConnected, "Zyrane");
        session.record_value(SessionPhase::InGame, "ignored");
        assert_eq!(session.current_world(), Some("Zyrane"));
        assert!(session.username().is_none());
    }

    #[test]
    fn test_phase_serde_name() {
        let json = serde_json::to_string(&SessionPhase::CompanySelected).unwrap();
        assert_eq!(json, "\"company_selected\"");
        let phase: SessionPhase = serde_yaml::from_str("in_game").unwrap();
        assert_eq!(phase, SessionPhase::InGame);
    }
}
