use brain_core::types::{RecurrenceType, Task};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// The next instant a recurring task should fire after its current
/// `next_execution` (or `due_at` if it hasn't fired yet), or `None` if the
/// recurrence is exhausted and the task should be marked done instead of
/// re-enqueued.
pub fn compute_next_occurrence(task: &Task) -> Option<DateTime<Utc>> {
    let config = task.recurrence_config.as_ref()?;

    if let Some(max) = config.max_occurrences {
        if task.execution_count + 1 >= max {
            return None;
        }
    }

    let reference = task.next_execution.or(task.due_at).unwrap_or_else(Utc::now);
    let interval = config.interval.max(1) as i32;

    let next = match config.recurrence_type {
        RecurrenceType::Daily => reference + Duration::days(interval as i64),
        RecurrenceType::Weekly => reference + Duration::weeks(interval as i64),
        RecurrenceType::Monthly => add_months_preserving_day(reference, interval),
        RecurrenceType::Yearly => add_years_preserving_month_day(reference, interval),
        RecurrenceType::Custom => {
            let base_secs = config.custom_base_unit_secs.unwrap_or(86_400);
            reference + Duration::seconds(base_secs * interval as i64)
        }
    };

    if let Some(end) = config.end_date {
        if next > end {
            return None;
        }
    }

    Some(next)
}

/// Adds `months` calendar months to `dt`, preserving day-of-month where
/// possible and falling back to the last day of a shorter target month
/// (e.g. Jan 31 + 1 month → Feb 28/29, not Mar 3).
fn add_months_preserving_day(dt: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let total = dt.year() * 12 + (dt.month() as i32 - 1) + months;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = dt.day().min(days_in_month(year, month));
    build(year, month, day, dt).unwrap_or(dt)
}

/// Adds `years` years to `dt`, preserving month/day except Feb 29 in a
/// non-leap target year, which falls back to Feb 28.
fn add_years_preserving_month_day(dt: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    let year = dt.year() + years;
    let day = if dt.month() == 2 && dt.day() == 29 && !is_leap_year(year) {
        28
    } else {
        dt.day()
    };
    build(year, dt.month(), day, dt).unwrap_or(dt)
}

fn build(year: i32, month: u32, day: u32, template: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, template.hour(), template.minute(), template.second())
        .single()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => if is_leap_year(year) { 29 } else { 28 },
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::types::{RecurrenceConfig, TaskId, TaskStatus, UserId};

    fn base_task(recurrence_type: RecurrenceType, interval: u32) -> Task {
        Task {
            id: TaskId::new(),
            user_id: UserId::from("u1"),
            title: "t".to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: 3,
            tags: Vec::new(),
            scheduled_at: None,
            due_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()),
            is_recurring: true,
            recurrence_config: Some(RecurrenceConfig {
                recurrence_type,
                interval,
                days_of_week: Vec::new(),
                days_of_month: Vec::new(),
                months_of_year: Vec::new(),
                end_date: None,
                max_occurrences: None,
                custom_base_unit_secs: None,
            }),
            parent_task_id: None,
            next_execution: None,
            execution_count: 0,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn daily_advances_by_interval_days() {
        let task = base_task(RecurrenceType::Daily, 1);
        let next = compute_next_occurrence(&task).expect("daily recurrence should produce a next run");
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_advances_by_interval_weeks() {
        let task = base_task(RecurrenceType::Weekly, 2);
        let next = compute_next_occurrence(&task).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 24, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_falls_back_to_last_day_of_a_shorter_month() {
        let mut task = base_task(RecurrenceType::Monthly, 1);
        task.due_at = Some(Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap());
        let next = compute_next_occurrence(&task).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()); // 2024 is a leap year
    }

    #[test]
    fn yearly_folds_feb_29_to_feb_28_in_a_non_leap_year() {
        let mut task = base_task(RecurrenceType::Yearly, 1);
        task.due_at = Some(Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
        let next = compute_next_occurrence(&task).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn custom_uses_the_configured_base_unit() {
        let mut task = base_task(RecurrenceType::Custom, 3);
        if let Some(config) = task.recurrence_config.as_mut() {
            config.custom_base_unit_secs = Some(3600);
        }
        let next = compute_next_occurrence(&task).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn max_occurrences_reached_stops_recurrence() {
        let mut task = base_task(RecurrenceType::Daily, 1);
        task.execution_count = 4;
        if let Some(config) = task.recurrence_config.as_mut() {
            config.max_occurrences = Some(5);
        }
        assert!(compute_next_occurrence(&task).is_none());
    }

    #[test]
    fn end_date_passed_stops_recurrence() {
        let mut task = base_task(RecurrenceType::Daily, 1);
        if let Some(config) = task.recurrence_config.as_mut() {
            config.end_date = Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        }
        assert!(compute_next_occurrence(&task).is_none());
    }
}
