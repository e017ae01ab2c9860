//! Statistics over the session history and the sprout garden.

use crate::models::{HistoryEntry, SessionType, Settings, Sprouts, Tag};
use chrono::{DateTime, Days, Local, NaiveDate};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Number of history entries listed as recent.
pub const RECENT_LIMIT: usize = 20;
/// Days covered by the per-day breakdown, ending today.
pub const DAILY_WINDOW: u64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Completed work sessions.
    pub total_sessions: u32,
    /// Work sessions times the current work duration.
    pub total_minutes: u32,
    /// Consecutive days with a work session, ending today.
    pub streak: u32,
    pub total_sprouts: u32,
    /// Work sessions per day, oldest first.
    pub daily: Vec<(NaiveDate, u32)>,
    /// Work sessions per tag, most used first.
    pub by_tag: Vec<(Tag, u32)>,
    /// Newest first.
    pub recent: Vec<HistoryEntry>,
}

impl Stats {
    pub fn compute(
        history: &[HistoryEntry],
        sprouts: &Sprouts,
        settings: &Settings,
        today: NaiveDate,
    ) -> Self {
        let work: Vec<&HistoryEntry> = history
            .iter()
            .filter(|entry| entry.session_type == SessionType::Work)
            .collect();
        let total_sessions = work.len() as u32;

        let daily = (0..DAILY_WINDOW)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| {
                let count = work.iter().filter(|entry| entry.date == date).count() as u32;
                (date, count)
            })
            .collect();

        let mut tag_counts: HashMap<&Tag, u32> = HashMap::new();
        for entry in &work {
            *tag_counts.entry(&entry.tag).or_insert(0) += 1;
        }
        let mut by_tag: Vec<(Tag, u32)> = tag_counts
            .into_iter()
            .map(|(tag, count)| (tag.clone(), count))
            .collect();
        by_tag.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        Self {
            total_sessions,
            total_minutes: total_sessions.saturating_mul(settings.work_duration),
            streak: streak(work.iter().map(|entry| entry.date), today),
            total_sprouts: sprouts.total(),
            daily,
            by_tag,
            recent: history.iter().rev().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}

/// Counts consecutive days, walking back from `today`, that appear in `dates`.
/// A day without sessions today means no streak.
pub fn streak(dates: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut count = 0;
    let mut day = today;
    while days.contains(&day) {
        count += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    count
}

/// Coarse age of a history entry: `5m ago`, `3h ago`, `2d ago`, or the date.
pub fn format_age(entry: &HistoryEntry, now: DateTime<Local>) -> String {
    let mins = (now.timestamp_millis() - entry.timestamp).max(0) / 60_000;
    let hours = mins / 60;
    let days = hours / 24;

    if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        entry.date.format("%Y-%m-%d").to_string()
    }
}

/// One history line, e.g. `Work Session  Write report  [Study]`.
pub fn format_entry(entry: &HistoryEntry) -> String {
    let task = if entry.task.is_empty() {
        "Untitled session"
    } else {
        entry.task.as_str()
    };
    format!("{}  {}  [{}]", entry.session_type.label(), task, entry.tag)
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sessions:      {}", self.total_sessions)?;
        writeln!(f, "Focus minutes: {}", self.total_minutes)?;
        writeln!(f, "Streak:        {} days", self.streak)?;
        writeln!(f, "Sprouts:       {}", self.total_sprouts)?;

        writeln!(f)?;
        writeln!(f, "Last {} days:", DAILY_WINDOW)?;
        for (date, count) in &self.daily {
            writeln!(f, "  {}  {:>3}  {}", date.format("%a %m-%d"), count, "#".repeat(*count as usize))?;
        }

        if !self.by_tag.is_empty() {
            writeln!(f)?;
            writeln!(f, "By tag:")?;
            for (tag, count) in &self.by_tag {
                writeln!(f, "  {:<12} {:>3}  {}", tag.as_str(), count, tag.color())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn entry(session_type: SessionType, tag: Tag, day: u32) -> HistoryEntry {
        let at = Local.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap();
        HistoryEntry {
            session_type,
            tag,
            task: String::new(),
            timestamp: at.timestamp_millis(),
            date: date(day),
        }
    }

    #[test]
    fn test_empty_history() {
        let stats = Stats::compute(&[], &Sprouts::default(), &Settings::default(), date(10));
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.total_minutes, 0);
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.daily.len(), 7);
        assert!(stats.daily.iter().all(|(_, count)| *count == 0));
        assert!(stats.by_tag.is_empty());
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn test_counts_only_work_sessions() {
        let history = vec![
            entry(SessionType::Work, Tag::Work, 9),
            entry(SessionType::ShortBreak, Tag::Work, 9),
            entry(SessionType::Work, Tag::Study, 10),
            entry(SessionType::Work, Tag::Study, 10),
        ];
        let mut sprouts = Sprouts::default();
        sprouts.add(date(9));
        sprouts.add(date(10));
        sprouts.add(date(10));
        let settings = Settings {
            work_duration: 50,
            ..Settings::default()
        };

        let stats = Stats::compute(&history, &sprouts, &settings, date(10));

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_minutes, 150);
        assert_eq!(stats.total_sprouts, 3);
        assert_eq!(stats.streak, 2);
        assert_eq!(stats.by_tag, vec![(Tag::Study, 2), (Tag::Work, 1)]);
        assert_eq!(stats.daily.first(), Some(&(date(4), 0)));
        assert_eq!(stats.daily[5], (date(9), 1));
        assert_eq!(stats.daily[6], (date(10), 2));
    }

    #[test]
    fn test_streak() {
        assert_eq!(streak([date(8), date(9), date(10)], date(10)), 3);
        assert_eq!(streak([date(10), date(10), date(9)], date(10)), 2);
        // A gap ends the streak
        assert_eq!(streak([date(7), date(9), date(10)], date(10)), 2);
        // Nothing today means no streak, even with a run up to yesterday
        assert_eq!(streak([date(8), date(9)], date(10)), 0);
        assert_eq!(streak(std::iter::empty(), date(10)), 0);
    }

    #[test]
    fn test_recent_is_newest_first_and_capped() {
        let history: Vec<HistoryEntry> = (1..=25)
            .map(|day| entry(SessionType::Work, Tag::Other, day))
            .collect();

        let stats = Stats::compute(&history, &Sprouts::default(), &Settings::default(), date(25));

        assert_eq!(stats.recent.len(), RECENT_LIMIT);
        assert_eq!(stats.recent[0].date, date(25));
        assert_eq!(stats.recent[19].date, date(6));
        assert_eq!(stats.streak, 25);
    }

    #[test]
    fn test_format_age() {
        let e = entry(SessionType::Work, Tag::Work, 10);
        let at = |d, h, m| Local.with_ymd_and_hms(2024, 5, d, h, m, 0).unwrap();
        assert_eq!(format_age(&e, at(10, 9, 5)), "5m ago");
        assert_eq!(format_age(&e, at(10, 12, 0)), "3h ago");
        assert_eq!(format_age(&e, at(12, 10, 0)), "2d ago");
        assert_eq!(format_age(&e, at(30, 10, 0)), "2024-05-10");
    }

    #[test]
    fn test_format_entry() {
        let mut e = entry(SessionType::Work, Tag::Study, 10);
        assert_eq!(format_entry(&e), "Work Session  Untitled session  [Study]");
        e.task = "Read chapter 3".to_string();
        e.session_type = SessionType::ShortBreak;
        assert_eq!(format_entry(&e), "Short Break  Read chapter 3  [Study]");
    }

    #[test]
    fn test_display_lists_tags_with_colors() {
        let history = vec![entry(SessionType::Work, Tag::Custom("Admin".into()), 10)];
        let stats = Stats::compute(&history, &Sprouts::default(), &Settings::default(), date(10));
        let text = stats.to_string();
        assert!(text.contains("Sessions:      1"));
        assert!(text.contains("Focus minutes: 25"));
        assert!(text.contains("Admin"));
        assert!(text.contains("#4B5563"));
    }
}
