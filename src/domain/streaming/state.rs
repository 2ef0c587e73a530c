//! Connection lifecycle of a streaming client.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// `idle → connecting → streaming → (complete | aborted | failed)`.
///
/// A failed attempt may go back to `connecting` while retries remain, and an
/// abort is possible from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Complete,
    Aborted,
    Failed,
}

impl StreamState {
    /// Whether a connection is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, StreamState::Connecting | StreamState::Streaming)
    }
}

impl StateMachine for StreamState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use StreamState::*;
        matches!(
            (self, target),
            (Idle, Connecting)
                | (Idle, Aborted)
                | (Connecting, Connecting)
                | (Connecting, Streaming)
                | (Connecting, Aborted)
                | (Connecting, Failed)
                | (Streaming, Connecting)
                | (Streaming, Complete)
                | (Streaming, Aborted)
                | (Streaming, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use StreamState::*;
        match self {
            Idle => vec![Connecting, Aborted],
            Connecting => vec![Connecting, Streaming, Aborted, Failed],
            Streaming => vec![Connecting, Complete, Aborted, Failed],
            Complete | Aborted | Failed => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_valid() {
        let state = StreamState::Idle
            .transition_to(StreamState::Connecting)
            .and_then(|s| s.transition_to(StreamState::Streaming))
            .and_then(|s| s.transition_to(StreamState::Complete))
            .unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn cannot_stream_without_connecting() {
        assert!(StreamState::Idle.transition_to(StreamState::Streaming).is_err());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for state in [StreamState::Complete, StreamState::Aborted, StreamState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.is_active());
            assert!(state.transition_to(StreamState::Connecting).is_err());
        }
    }

    #[test]
    fn transitions_agree_with_valid_list() {
        let all = [
            StreamState::Idle,
            StreamState::Connecting,
            StreamState::Streaming,
            StreamState::Complete,
            StreamState::Aborted,
            StreamState::Failed,
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }
}
