//! Conversation transcript

use serde::Serialize;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The learner
    User,
    /// The scenario avatar
    Bot,
}

/// One exchange entry, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Speaker role
    pub role: Role,
    /// Message text
    pub message: String,
    /// Correctness judgement carried on bot turns in training mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// Append-only transcript of one conversation
///
/// Owned exclusively by the coordinator; network clients never touch it.
#[derive(Debug, Default, Serialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Create an empty history
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a user turn
    pub fn push_user(&mut self, message: String) {
        self.turns.push(Turn {
            role: Role::User,
            message,
            correct: None,
        });
    }

    /// Append a bot turn
    pub fn push_bot(&mut self, message: String, correct: Option<bool>) {
        self.turns.push(Turn {
            role: Role::Bot,
            message,
            correct,
        });
    }

    /// All turns in order of appearance
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns have been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of user turns recorded
    #[must_use]
    pub fn user_turns(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_keep_insertion_order() {
        let mut history = ConversationHistory::new();
        history.push_user("Hallo".into());
        history.push_bot("Guten Tag!".into(), Some(true));
        history.push_user("Einen Kaffee, bitte".into());

        let roles: Vec<Role> = history.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Bot, Role::User]);
        assert_eq!(history.user_turns(), 2);
    }

    #[test]
    fn bot_turns_carry_correctness() {
        let mut history = ConversationHistory::new();
        history.push_bot("Nicht ganz.".into(), Some(false));
        assert_eq!(history.turns()[0].correct, Some(false));
    }

    #[test]
    fn user_turns_carry_no_correctness() {
        let mut history = ConversationHistory::new();
        history.push_user("Hallo".into());
        assert_eq!(history.turns()[0].correct, None);
    }
}
