use chrono::{NaiveTime, Timelike};

use crate::error::{Result, SchedulerError};
use super::types::{ScheduleConfig, TimeSlot};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parses a wall-clock time ("8:00", "08:00" or "08:00:00") to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<i64> {
    let clean = time_str.trim();
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(clean, fmt).ok())
        .map(|t| i64::from(t.num_seconds_from_midnight() / 60))
}

/// Formats minutes since midnight as a slot label: 12-hour clock, no leading
/// zero on the hour, no AM/PM ("9:00", "12:30", "1:10")
pub fn minutes_to_slot_label(minutes: i64) -> String {
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
    let (hour, minute) = ((minutes / 60) as u32, (minutes % 60) as u32);
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => format!("{}:{:02}", time.hour12().1, time.minute()),
        None => format!("{}:{:02}", hour, minute),
    }
}

/// Generates the slot labels for a schedule window.
///
/// Slots start at `start_time` and advance by `duration` minutes. A slot is
/// kept while its pitch fits inside `[start_time, end_time)`, so the end time
/// itself never starts a slot.
pub fn generate_time_slots(start_time: &str, end_time: &str, duration: i64) -> Result<Vec<String>> {
    if duration <= 0 {
        return Err(SchedulerError::invalid_window(format!(
            "duration must be positive, got {}",
            duration
        )));
    }
    let start = parse_time_to_minutes(start_time)
        .ok_or_else(|| SchedulerError::invalid_window(format!("cannot parse start time '{}'", start_time)))?;
    let end = parse_time_to_minutes(end_time)
        .ok_or_else(|| SchedulerError::invalid_window(format!("cannot parse end time '{}'", end_time)))?;
    if end <= start {
        return Err(SchedulerError::invalid_window(format!(
            "end time {} is not after start time {}",
            end_time, start_time
        )));
    }

    let mut labels = Vec::new();
    let mut current = start;
    while current + duration <= end {
        labels.push(minutes_to_slot_label(current));
        current += duration;
    }
    Ok(labels)
}

/// Generates indexed time slots from a schedule config
pub fn calculate_time_slots(config: &ScheduleConfig) -> Result<Vec<TimeSlot>> {
    let labels = generate_time_slots(&config.start_time, &config.end_time, config.duration)?;
    Ok(labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| TimeSlot { index, label })
        .collect())
}

/// Label of an arbitrary row, continuing the duration sequence past the end
/// of the window for rows appended by shift-insert
pub fn label_for_row(config: &ScheduleConfig, row: usize) -> Result<String> {
    if config.duration <= 0 {
        return Err(SchedulerError::invalid_window(format!(
            "duration must be positive, got {}",
            config.duration
        )));
    }
    let start = parse_time_to_minutes(&config.start_time).ok_or_else(|| {
        SchedulerError::invalid_window(format!("cannot parse start time '{}'", config.start_time))
    })?;
    Ok(minutes_to_slot_label(start + row as i64 * config.duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_time_is_excluded() {
        let slots = generate_time_slots("8:00", "8:30", 10).unwrap();
        assert_eq!(slots, vec!["8:00", "8:10", "8:20"]);
    }

    #[test]
    fn test_window_shorter_than_pitch_is_empty() {
        let slots = generate_time_slots("8:00", "8:05", 10).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_labels_use_twelve_hour_clock() {
        let slots = generate_time_slots("11:40", "13:20", 20).unwrap();
        assert_eq!(slots, vec!["11:40", "12:00", "12:20", "12:40", "1:00"]);
    }

    #[test]
    fn test_midnight_renders_as_twelve() {
        let slots = generate_time_slots("00:00", "00:30", 15).unwrap();
        assert_eq!(slots, vec!["12:00", "12:15"]);
    }

    #[test]
    fn test_accepts_padded_and_seconds_formats() {
        assert_eq!(parse_time_to_minutes("08:00"), Some(480));
        assert_eq!(parse_time_to_minutes("8:05"), Some(485));
        assert_eq!(parse_time_to_minutes("17:00:00"), Some(1020));
        assert_eq!(parse_time_to_minutes("noon"), None);
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        assert!(matches!(
            generate_time_slots("8:00", "9:00", 0),
            Err(SchedulerError::InvalidScheduleWindow { .. })
        ));
        assert!(matches!(
            generate_time_slots("8:00", "9:00", -5),
            Err(SchedulerError::InvalidScheduleWindow { .. })
        ));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        assert!(matches!(
            generate_time_slots("9:00", "9:00", 10),
            Err(SchedulerError::InvalidScheduleWindow { .. })
        ));
        assert!(matches!(
            generate_time_slots("17:00", "8:00", 10),
            Err(SchedulerError::InvalidScheduleWindow { .. })
        ));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_time_slots("09:00", "17:00", 10).unwrap();
        let b = generate_time_slots("09:00", "17:00", 10).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 48);
    }

    #[test]
    fn test_calculate_time_slots_indexes_rows() {
        let config = ScheduleConfig {
            start_time: "8:00".to_string(),
            end_time: "8:30".to_string(),
            duration: 10,
        };
        let slots = calculate_time_slots(&config).unwrap();
        assert_eq!(slots[2], TimeSlot { index: 2, label: "8:20".to_string() });
    }

    #[test]
    fn test_label_for_row_continues_past_window() {
        let config = ScheduleConfig {
            start_time: "8:00".to_string(),
            end_time: "8:30".to_string(),
            duration: 10,
        };
        assert_eq!(label_for_row(&config, 0).unwrap(), "8:00");
        assert_eq!(label_for_row(&config, 4).unwrap(), "8:40");
        assert_eq!(label_for_row(&config, 30).unwrap(), "1:00");
    }
}
