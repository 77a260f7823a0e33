//! Token accounting.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Token counts reported for one inference call, or accumulated over a
/// whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the request (the full conversation plus declarations).
    pub input_tokens: u64,
    /// Tokens the model generated.
    pub output_tokens: u64,
    /// Of `output_tokens`, how many were spent on hidden reasoning.
    pub reasoning_tokens: Option<u64>,
}

impl Usage {
    /// Input plus output tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Usage) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.reasoning_tokens = match (self.reasoning_tokens, rhs.reasoning_tokens) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assign_accumulates() {
        let mut total = Usage::default();
        total += &Usage {
            input_tokens: 100,
            output_tokens: 20,
            reasoning_tokens: None,
        };
        total += &Usage {
            input_tokens: 150,
            output_tokens: 30,
            reasoning_tokens: Some(12),
        };
        assert_eq!(total.input_tokens, 250);
        assert_eq!(total.output_tokens, 50);
        assert_eq!(total.reasoning_tokens, Some(12));
        assert_eq!(total.total_tokens(), 300);
    }

    #[test]
    fn test_reasoning_stays_none_when_never_reported() {
        let mut total = Usage::default();
        total += &Usage::default();
        assert_eq!(total.reasoning_tokens, None);
    }
}
