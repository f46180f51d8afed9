use chrono::{Days, Local, NaiveDate};

use crate::{Ledger, ResultEngine, RuleStore};

mod rules;
mod shared;
mod splits;

pub use shared::SharedTransactions;
pub use splits::{SplitFailure, SplitPreview};

/// Days looked back when no since-date is given.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Entry point of the engine: the three stages wired to a rule store and a
/// ledger.
///
/// Every operation re-reads the rule sheets, so changes to the sheets apply
/// on the next call without a restart.
#[derive(Debug)]
pub struct Engine<R, L> {
    rule_store: R,
    ledger: L,
    lookback_days: u32,
}

impl Engine<(), ()> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl<R: RuleStore, L: Ledger> Engine<R, L> {
    /// Since-date used when the caller gives none: today minus the lookback.
    #[must_use]
    pub fn default_since(&self) -> NaiveDate {
        let today = Local::now().date_naive();
        today
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .unwrap_or(today)
    }

    fn since_or_default(&self, since: Option<NaiveDate>) -> NaiveDate {
        since.unwrap_or_else(|| self.default_since())
    }
}

/// The builder for `Engine`
pub struct EngineBuilder<R = (), L = ()> {
    rule_store: R,
    ledger: L,
    lookback_days: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            rule_store: (),
            ledger: (),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl<R, L> EngineBuilder<R, L> {
    /// Pass the required rule store
    pub fn rule_store<R2: RuleStore>(self, rule_store: R2) -> EngineBuilder<R2, L> {
        EngineBuilder {
            rule_store,
            ledger: self.ledger,
            lookback_days: self.lookback_days,
        }
    }

    /// Pass the required ledger
    pub fn ledger<L2: Ledger>(self, ledger: L2) -> EngineBuilder<R, L2> {
        EngineBuilder {
            rule_store: self.rule_store,
            ledger,
            lookback_days: self.lookback_days,
        }
    }

    /// Days looked back when no since-date is given
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }
}

impl<R: RuleStore, L: Ledger> EngineBuilder<R, L> {
    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine<R, L>> {
        Ok(Engine {
            rule_store: self.rule_store,
            ledger: self.ledger,
            lookback_days: self.lookback_days,
        })
    }
}
