use chrono::{Datelike, Utc};

use crate::config::Settings;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySelection {
    pub day: String,
    pub category: String,
    pub feeds: Vec<String>,
}

/// UTC weekday, 0 = Monday .. 6 = Sunday.
pub fn current_weekday() -> usize {
    Utc::now().weekday().num_days_from_monday() as usize
}

/// Category and feeds configured for `weekday`. An unconfigured weekday
/// yields an empty selection rather than an error.
pub fn select_category(settings: &Settings, weekday: usize) -> CategorySelection {
    settings
        .daily_categories
        .for_weekday(weekday)
        .map(|daily| CategorySelection {
            day: daily.day.clone(),
            category: daily.category.clone(),
            feeds: daily.feeds.clone(),
        })
        .unwrap_or_default()
}
