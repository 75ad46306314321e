use alloy_primitives::Address;

use crate::error::{ErrorCode, Result};

/// Source of the currently active funding rounds, in priority order.
pub trait RoundRegistry: Send + Sync {
    fn active_rounds(&self) -> Result<Vec<Address>>;
}

/// Donations target a single round: the first active one.
pub fn first_active_round(registry: &dyn RoundRegistry) -> Result<Address> {
    registry
        .active_rounds()?
        .into_iter()
        .next()
        .ok_or(ErrorCode::PlanningNoActiveRound)
}

#[derive(Clone, Debug, Default)]
pub struct StaticRoundRegistry {
    rounds: Vec<Address>,
}

impl StaticRoundRegistry {
    pub fn new(rounds: impl IntoIterator<Item = Address>) -> Self {
        Self {
            rounds: rounds.into_iter().collect(),
        }
    }
}

impl RoundRegistry for StaticRoundRegistry {
    fn active_rounds(&self) -> Result<Vec<Address>> {
        Ok(self.rounds.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_round_wins() {
        let registry =
            StaticRoundRegistry::new([Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)]);
        assert_eq!(
            first_active_round(&registry).unwrap(),
            Address::repeat_byte(0x0a)
        );
    }

    #[test]
    fn no_rounds_is_a_planning_error() {
        let registry = StaticRoundRegistry::default();
        assert_eq!(
            first_active_round(&registry).unwrap_err(),
            ErrorCode::PlanningNoActiveRound
        );
    }
}
