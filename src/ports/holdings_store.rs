//! Persistence port for the user's holdings list.

use crate::domain::error::RiskboardError;
use crate::domain::portfolio::Portfolio;

pub trait HoldingsStore {
    fn load(&self) -> Result<Portfolio, RiskboardError>;
    fn save(&self, portfolio: &Portfolio) -> Result<(), RiskboardError>;
}
