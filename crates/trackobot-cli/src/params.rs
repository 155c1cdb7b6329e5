use chrono::NaiveDate;
use clap::ValueEnum;

use crate::error::{Error, Result};

/// Wire format for custom range dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declares a closed set of values the service accepts for one parameter.
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $api:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[value(name = $api)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_api_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $api,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_api_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_api_str() == s)
                    .ok_or_else(|| {
                        Error::invalid($label, s, one_of(Self::ALL.iter().map(Self::as_api_str)))
                    })
            }
        }
    };
}

fn one_of<'a>(values: impl Iterator<Item = &'a str>) -> String {
    format!("one of {}", values.collect::<Vec<_>>().join(", "))
}

api_enum! {
    /// Statistics view.
    #[derive(Default)]
    StatsType ("stats type") {
        Classes => "classes",
        #[default]
        Decks => "decks",
        Arena => "arena",
    }
}

api_enum! {
    #[derive(Default)]
    TimeRange ("time range") {
        CurrentMonth => "current_month",
        #[default]
        All => "all",
        Last3Days => "last_3_days",
        Last24Hours => "last_24_hours",
        Custom => "custom",
    }
}

api_enum! {
    /// Game mode filter for statistics.
    #[derive(Default)]
    StatsMode ("mode") {
        Ranked => "ranked",
        Arena => "arena",
        Casual => "casual",
        Friendly => "friendly",
        #[default]
        All => "all",
    }
}

api_enum! {
    /// Game mode whose data an account reset wipes.
    ResetMode ("reset mode") {
        Ranked => "ranked",
        Casual => "casual",
        Practice => "practice",
        Arena => "arena",
        Friendly => "friendly",
    }
}

api_enum! {
    /// Game record fields that can be changed after upload.
    MetadataField ("metadata field") {
        Added => "added",
        Mode => "mode",
        Win => "win",
        Hero => "hero",
        Opponent => "opponent",
        Coin => "coin",
        Duration => "duration",
        Rank => "rank",
        Legend => "legend",
        DeckId => "deck_id",
        OpponentDeckId => "opponent_deck_id",
        Note => "note",
    }
}

api_enum! {
    /// Hero class.
    Hero ("hero") {
        Druid => "druid",
        Hunter => "hunter",
        Mage => "mage",
        Paladin => "paladin",
        Priest => "priest",
        Rogue => "rogue",
        Shaman => "shaman",
        Warlock => "warlock",
        Warrior => "warrior",
    }
}

impl ResetMode {
    /// Modes a reset request covers: every mode when `None`, otherwise the
    /// given modes in order with duplicates dropped.
    pub fn selection(modes: Option<&[ResetMode]>) -> Result<Vec<ResetMode>> {
        let Some(modes) = modes else {
            return Ok(Self::ALL.to_vec());
        };
        if modes.is_empty() {
            return Err(Error::invalid(
                "reset mode",
                "",
                "at least one mode (omit the list to reset everything)".into(),
            ));
        }
        let mut selected = Vec::with_capacity(modes.len());
        for mode in modes {
            if !selected.contains(mode) {
                selected.push(*mode);
            }
        }
        Ok(selected)
    }
}

/// Parse a `YYYY-MM-DD` date for a custom stats range.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidDateRange(format!("'{value}' is not a YYYY-MM-DD date")))
}

/// Parameters for the statistics endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsQuery {
    pub stats_type: StatsType,
    pub time_range: TimeRange,
    pub mode: StatsMode,
    pub hero: Option<Hero>,
    pub opponent: Option<Hero>,
    pub deck: Option<String>,
    pub opponent_deck: Option<String>,
    /// Only sent when `time_range` is `Custom`.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl StatsQuery {
    pub fn new(stats_type: StatsType) -> Self {
        Self {
            stats_type,
            ..Self::default()
        }
    }

    pub fn time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn mode(mut self, mode: StatsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Switch to a custom range covering `start..=end`.
    pub fn custom_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.time_range = TimeRange::Custom;
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub(crate) fn path(&self) -> String {
        format!("/profile/stats/{}.json", self.stats_type)
    }

    /// Query string pairs, failing if a custom range lacks either date.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        let mut pairs = vec![
            ("mode", self.mode.to_string()),
            ("time_range", self.time_range.to_string()),
        ];
        if let Some(hero) = self.hero {
            pairs.push(("as_hero", hero.to_string()));
        }
        if let Some(opponent) = self.opponent {
            pairs.push(("vs_hero", opponent.to_string()));
        }
        if let Some(deck) = &self.deck {
            pairs.push(("as_deck", deck.clone()));
        }
        if let Some(deck) = &self.opponent_deck {
            pairs.push(("vs_deck", deck.clone()));
        }
        if self.time_range == TimeRange::Custom {
            let start = self
                .start
                .ok_or_else(|| Error::InvalidDateRange("a start date is required".into()))?;
            let end = self
                .end
                .ok_or_else(|| Error::InvalidDateRange("an end date is required".into()))?;
            pairs.push(("start", start.format(DATE_FORMAT).to_string()));
            pairs.push(("end", end.format(DATE_FORMAT).to_string()));
        }
        Ok(pairs)
    }
}
