//! Persistence port for state carried across sessions.

use crate::domain::error::StuntmanError;
use crate::domain::execution::TradingState;
use crate::domain::learning::LearnedParameters;

/// Narrow load/save interface; the engine never reads or writes storage itself.
pub trait StatePort {
    /// `None` when nothing has been saved yet.
    fn load_state(&self) -> Result<Option<TradingState>, StuntmanError>;

    fn save_state(&self, state: &TradingState) -> Result<(), StuntmanError>;

    /// Empty parameters when nothing has been saved yet.
    fn load_parameters(&self) -> Result<LearnedParameters, StuntmanError>;

    fn save_parameters(&self, params: &LearnedParameters) -> Result<(), StuntmanError>;
}
