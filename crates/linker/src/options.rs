use opmatch_core::Money;
use serde::{Deserialize, Deserializer};

use crate::linker::LinkError;

pub const DEFAULT_PAST_WINDOW_DAYS: u64 = 15;
pub const DEFAULT_FUTURE_WINDOW_DAYS: u64 = 29;
pub const DEFAULT_DATE_WEIGHT: f64 = 0.7;
pub const DEFAULT_AMOUNT_WEIGHT: f64 = 0.3;

/// Tunables for one linker run.
///
/// `identifiers` is the only mandatory field: the vendor label aliases
/// an operation's free-text label is matched against. Everything else
/// carries the documented defaults. The ranker weights and the amount
/// delta are inherited heuristics, kept configurable rather than baked
/// in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    #[serde(deserialize_with = "one_or_many")]
    pub identifiers: Vec<String>,
    /// Fallback for both amount deltas. Defaults to 0.001 so only
    /// float-noise differences are tolerated unless widened.
    pub amount_delta: Money,
    pub min_amount_delta: Option<Money>,
    pub max_amount_delta: Option<Money>,
    /// Days searched before the bill's reference date.
    pub past_window: u64,
    /// Days searched after it.
    pub future_window: u64,
    /// Let uncategorized operations through the category filter.
    pub allow_uncategorized: bool,
    pub date_weight: f64,
    pub amount_weight: f64,
    /// Vendors whose bills may be reimbursed as one bundled operation.
    pub group_vendors: Vec<String>,
    /// Cap on candidate-query pages before the fetch is declared stuck.
    pub max_pages: u32,
    /// Attempts per store call, first one included.
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            identifiers: Vec::new(),
            amount_delta: Money::from_millis(1),
            min_amount_delta: None,
            max_amount_delta: None,
            past_window: DEFAULT_PAST_WINDOW_DAYS,
            future_window: DEFAULT_FUTURE_WINDOW_DAYS,
            allow_uncategorized: false,
            date_weight: DEFAULT_DATE_WEIGHT,
            amount_weight: DEFAULT_AMOUNT_WEIGHT,
            group_vendors: vec!["Numéricable".to_string()],
            max_pages: 50,
            retry_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

impl LinkOptions {
    pub fn for_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LinkOptions {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, LinkError> {
        let options: LinkOptions =
            toml::from_str(content).map_err(|e| LinkError::Config(e.to_string()))?;
        Ok(options)
    }

    /// Fails fast on the mandatory `identifiers`, case-folds them.
    /// Called before any I/O.
    pub(crate) fn validate(&mut self) -> Result<(), LinkError> {
        if self.identifiers.is_empty() {
            return Err(LinkError::MissingIdentifiers);
        }
        for identifier in &mut self.identifiers {
            *identifier = identifier.to_lowercase();
        }
        Ok(())
    }

    pub(crate) fn min_delta(&self) -> Money {
        self.min_amount_delta.unwrap_or(self.amount_delta)
    }

    pub(crate) fn max_delta(&self) -> Money {
        self.max_amount_delta.unwrap_or(self.amount_delta)
    }
}

/// The connector manifest allows a single alias or a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(identifier) => vec![identifier],
        OneOrMany::Many(identifiers) => identifiers,
    })
}
