use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the two legs of a pair spread column name.
pub const SPREAD_SEPARATOR: &str = " - ";
/// Suffix of the release-stamped variant of a weekly metric.
pub const RELEASE_SUFFIX: &str = " (Release)";
/// Suffix of the interpolated variant of a weekly metric.
pub const INTERP_SUFFIX: &str = " (Interp)";

/// Futures delivery month codes, January to December.
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// What a table column holds.
///
/// Consumers read this instead of pattern-matching column names. The names
/// themselves still follow the conventions below because external tools
/// match on them:
/// - Month legs: `"%CL 3!"`
/// - Calendar legs: `"CL Z25"`
/// - Pair spreads: `"<near> - <far>"`
/// - Weekly derived: `"<metric> (Release)"`, `"<metric> (Interp)"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Front-month ladder leg (1 = prompt)
    MonthLeg { ordinal: u32 },
    /// Calendar-year coded leg (e.g. December 2025)
    CalendarLeg { month: char, year: i32 },
    /// Difference of two legs
    Spread { near: String, far: String },
    /// Prompt (M1 - M2) shorthand spread
    PromptSpread,
    /// Rolling calendar-year spread re-resolved every row
    ColourSpread,
    /// Any other raw daily column (inventory levels, notes)
    Metric,
    /// Weekly metric stamped on its release date
    Release { metric: String },
    /// Weekly metric linearly interpolated to daily
    Interp { metric: String },
}

impl ColumnKind {
    /// Classifies a raw column name.
    ///
    /// # Arguments
    /// * `name` - Trimmed column name
    /// * `root` - Product root symbol (e.g. `"CL"`)
    /// * `prompt_spread` - Name of the prompt spread column
    /// * `colour_spreads` - Names of the configured colour spreads
    pub fn classify(name: &str, root: &str, prompt_spread: &str, colour_spreads: &[&str]) -> Self {
        if let Some(ordinal) = parse_month_leg(root, name) {
            return ColumnKind::MonthLeg { ordinal };
        }
        if let Some((month, year)) = parse_calendar_leg(root, name) {
            return ColumnKind::CalendarLeg { month, year };
        }
        if name == prompt_spread {
            return ColumnKind::PromptSpread;
        }
        if colour_spreads.contains(&name) {
            return ColumnKind::ColourSpread;
        }
        if let Some(metric) = name.strip_suffix(RELEASE_SUFFIX) {
            return ColumnKind::Release {
                metric: metric.to_string(),
            };
        }
        if let Some(metric) = name.strip_suffix(INTERP_SUFFIX) {
            return ColumnKind::Interp {
                metric: metric.to_string(),
            };
        }
        if let Some((near, far)) = name.split_once(SPREAD_SEPARATOR) {
            return ColumnKind::Spread {
                near: near.to_string(),
                far: far.to_string(),
            };
        }
        ColumnKind::Metric
    }

    /// Returns true for columns that carry the last known price across
    /// non-trading days (legs and every spread flavour).
    pub fn is_price_like(&self) -> bool {
        matches!(
            self,
            ColumnKind::MonthLeg { .. }
                | ColumnKind::CalendarLeg { .. }
                | ColumnKind::Spread { .. }
                | ColumnKind::PromptSpread
                | ColumnKind::ColourSpread
        )
    }

    /// Returns true for outright legs.
    pub fn is_leg(&self) -> bool {
        matches!(
            self,
            ColumnKind::MonthLeg { .. } | ColumnKind::CalendarLeg { .. }
        )
    }

    /// Returns true for any spread flavour.
    pub fn is_spread(&self) -> bool {
        matches!(
            self,
            ColumnKind::Spread { .. } | ColumnKind::PromptSpread | ColumnKind::ColourSpread
        )
    }

    /// Short label for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::MonthLeg { .. } => "month_leg",
            ColumnKind::CalendarLeg { .. } => "calendar_leg",
            ColumnKind::Spread { .. } => "spread",
            ColumnKind::PromptSpread => "prompt_spread",
            ColumnKind::ColourSpread => "colour_spread",
            ColumnKind::Metric => "metric",
            ColumnKind::Release { .. } => "release",
            ColumnKind::Interp { .. } => "interp",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name of the front-month ladder leg with the given ordinal.
pub fn month_leg_name(root: &str, ordinal: u32) -> String {
    format!("%{} {}!", root, ordinal)
}

/// Name of a calendar-year coded leg, e.g. `("CL", 'Z', 2025)` -> `"CL Z25"`.
pub fn calendar_leg_name(root: &str, month: char, year: i32) -> String {
    format!("{} {}{:02}", root, month, year.rem_euclid(100))
}

/// Name of the spread `near - far`.
pub fn spread_name(near: &str, far: &str) -> String {
    format!("{}{}{}", near, SPREAD_SEPARATOR, far)
}

/// Name of the release-stamped column of a weekly metric.
pub fn release_name(metric: &str) -> String {
    format!("{}{}", metric, RELEASE_SUFFIX)
}

/// Name of the interpolated column of a weekly metric.
pub fn interp_name(metric: &str) -> String {
    format!("{}{}", metric, INTERP_SUFFIX)
}

/// Parses `"%CL 12!"` into `12`.
pub fn parse_month_leg(root: &str, name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix('%')?
        .strip_prefix(root)?
        .strip_prefix(' ')?
        .strip_suffix('!')?
        .trim_start();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|ordinal| *ordinal > 0)
}

/// Parses `"CL Z25"` into `('Z', 2025)`. Two-digit years map to 2000-2099.
pub fn parse_calendar_leg(root: &str, name: &str) -> Option<(char, i32)> {
    let code = name.strip_prefix(root)?.strip_prefix(' ')?;
    let mut chars = code.chars();
    let month = chars.next()?;
    if !MONTH_CODES.contains(&month) {
        return None;
    }
    let digits = chars.as_str();
    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = digits.parse().ok()?;
    Some((month, 2000 + yy))
}

/// A named column together with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnSpec {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, tagged list of the columns of a built table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCatalog {
    columns: Vec<ColumnSpec>,
}

impl ColumnCatalog {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        ColumnCatalog { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Month legs with ordinal `<= max_ordinal`, sorted by ordinal.
    pub fn month_legs(&self, max_ordinal: u32) -> Vec<&str> {
        let mut legs: Vec<(u32, &str)> = self
            .columns
            .iter()
            .filter_map(|spec| match spec.kind {
                ColumnKind::MonthLeg { ordinal } if ordinal <= max_ordinal => {
                    Some((ordinal, spec.name.as_str()))
                }
                _ => None,
            })
            .collect();
        legs.sort_by_key(|(ordinal, _)| *ordinal);
        legs.into_iter().map(|(_, name)| name).collect()
    }

    /// Every spread flavour, in table order.
    pub fn spreads(&self) -> Vec<&str> {
        self.filter(ColumnKind::is_spread)
    }

    /// Price-like columns, in table order.
    pub fn price_like(&self) -> Vec<&str> {
        self.filter(ColumnKind::is_price_like)
    }

    /// Release and interp columns, in table order.
    pub fn weekly_derived(&self) -> Vec<&str> {
        self.filter(|kind| {
            matches!(
                kind,
                ColumnKind::Release { .. } | ColumnKind::Interp { .. }
            )
        })
    }

    fn filter<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&ColumnKind) -> bool,
    {
        self.columns
            .iter()
            .filter(|spec| predicate(&spec.kind))
            .map(|spec| spec.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> ColumnKind {
        ColumnKind::classify(name, "CL", "Prompt Spread", &["Dec Red", "Red/Blue"])
    }

    #[test]
    fn test_month_leg_round_trip() {
        let name = month_leg_name("CL", 12);
        assert_eq!(name, "%CL 12!");
        assert_eq!(parse_month_leg("CL", &name), Some(12));
    }

    #[test]
    fn test_month_leg_rejects_malformed() {
        assert_eq!(parse_month_leg("CL", "%CL !"), None);
        assert_eq!(parse_month_leg("CL", "%CL 0!"), None);
        assert_eq!(parse_month_leg("CL", "%CL 1"), None);
        assert_eq!(parse_month_leg("CL", "%HO 1!"), None);
        assert_eq!(parse_month_leg("CL", "%CL 1x!"), None);
    }

    #[test]
    fn test_calendar_leg_names() {
        assert_eq!(calendar_leg_name("CL", 'Z', 2025), "CL Z25");
        assert_eq!(calendar_leg_name("CL", 'Z', 2008), "CL Z08");
        assert_eq!(parse_calendar_leg("CL", "CL Z25"), Some(('Z', 2025)));
        assert_eq!(parse_calendar_leg("CL", "CL H07"), Some(('H', 2007)));
        assert_eq!(parse_calendar_leg("CL", "CL A25"), None);
        assert_eq!(parse_calendar_leg("CL", "CL Z2025"), None);
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(classify("%CL 3!"), ColumnKind::MonthLeg { ordinal: 3 });
        assert_eq!(
            classify("CL Z26"),
            ColumnKind::CalendarLeg {
                month: 'Z',
                year: 2026
            }
        );
        assert_eq!(classify("Prompt Spread"), ColumnKind::PromptSpread);
        assert_eq!(classify("Dec Red"), ColumnKind::ColourSpread);
        assert_eq!(
            classify("%CL 1! - %CL 2!"),
            ColumnKind::Spread {
                near: "%CL 1!".to_string(),
                far: "%CL 2!".to_string()
            }
        );
        assert_eq!(
            classify("Cushing Stocks (Mbbl) (Release)"),
            ColumnKind::Release {
                metric: "Cushing Stocks (Mbbl)".to_string()
            }
        );
        assert_eq!(classify("Cushing Stocks (Mbbl)"), ColumnKind::Metric);
    }

    #[test]
    fn test_price_like() {
        assert!(classify("%CL 3!").is_price_like());
        assert!(classify("Dec Red").is_price_like());
        assert!(classify("%CL 1! - %CL 4!").is_price_like());
        assert!(!classify("Cushing Stocks (Mbbl)").is_price_like());
        assert!(!classify("Crude (Interp)").is_price_like());
    }

    #[test]
    fn test_catalog_month_legs_sorted_and_capped() {
        let catalog = ColumnCatalog::new(vec![
            ColumnSpec::new("%CL 10!", ColumnKind::MonthLeg { ordinal: 10 }),
            ColumnSpec::new("%CL 2!", ColumnKind::MonthLeg { ordinal: 2 }),
            ColumnSpec::new("%CL 1!", ColumnKind::MonthLeg { ordinal: 1 }),
            ColumnSpec::new("%CL 13!", ColumnKind::MonthLeg { ordinal: 13 }),
            ColumnSpec::new("Prompt Spread", ColumnKind::PromptSpread),
        ]);
        assert_eq!(catalog.month_legs(12), vec!["%CL 1!", "%CL 2!", "%CL 10!"]);
        assert_eq!(catalog.spreads(), vec!["Prompt Spread"]);
    }

    #[test]
    fn test_column_spec_serializes_flat() {
        let spec = ColumnSpec::new("%CL 1!", ColumnKind::MonthLeg { ordinal: 1 });
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["name"], "%CL 1!");
        assert_eq!(json["kind"], "month_leg");
        assert_eq!(json["ordinal"], 1);
    }
}
