use super::entities::Task;
use super::enums::DueBucket;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// Classify a due date relative to `now`.
///
/// Calendar days and weeks are taken in `now`'s time zone; weeks start on Monday.
/// Checks run in a fixed order and the first match wins, so a past date that still
/// falls in the current week is `ThisWeek`, not `Overdue`.
pub fn classify_due_date<Tz: TimeZone>(due: Option<&DateTime<Utc>>, now: &DateTime<Tz>) -> DueBucket {
    let due = match due {
        Some(due) => due.with_timezone(&now.timezone()),
        None => return DueBucket::NoDueDate,
    };

    let today = now.date_naive();
    let due_day = due.date_naive();

    if due_day == today {
        return DueBucket::Today;
    }

    if Some(due_day) == today.succ_opt() {
        return DueBucket::Tomorrow;
    }

    let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let week_end = week_start + Duration::days(6);
    if due_day >= week_start && due_day <= week_end {
        return DueBucket::ThisWeek;
    }

    if *now > due {
        return DueBucket::Overdue;
    }

    DueBucket::Later
}

/// Group tasks into due-date buckets, in display order, omitting empty buckets.
/// Tasks keep their list order inside each bucket.
pub fn group_tasks_by_due_date<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    now: &DateTime<Tz>,
) -> Vec<(DueBucket, Vec<&'a Task>)> {
    DueBucket::all()
        .iter()
        .filter_map(|bucket| {
            let members: Vec<&Task> = tasks
                .iter()
                .filter(|t| classify_due_date(t.due_date.as_ref(), now) == *bucket)
                .collect();
            if members.is_empty() {
                None
            } else {
                Some((*bucket, members))
            }
        })
        .collect()
}

/// Checkbox shown in front of a task
pub fn completion_badge(task: &Task) -> &'static str {
    if task.completed {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Get tree connector for nested rows
pub fn tree_connector(is_last: bool) -> &'static str {
    if is_last {
        "└─"
    } else {
        "├─"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    // Wednesday 2024-05-15 12:00 UTC; week runs Mon 05-13 .. Sun 05-19
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn task_due(name: &str, due: Option<DateTime<Utc>>) -> Task {
        Task::new(name.to_string(), String::new(), due)
    }

    #[test]
    fn test_no_due_date() {
        assert_eq!(classify_due_date(None, &now()), DueBucket::NoDueDate);
    }

    #[test]
    fn test_today_regardless_of_hour() {
        assert_eq!(classify_due_date(Some(&at(2024, 5, 15, 0)), &now()), DueBucket::Today);
        assert_eq!(classify_due_date(Some(&at(2024, 5, 15, 23)), &now()), DueBucket::Today);
    }

    #[test]
    fn test_tomorrow() {
        assert_eq!(classify_due_date(Some(&at(2024, 5, 16, 9)), &now()), DueBucket::Tomorrow);
    }

    #[test]
    fn test_this_week_includes_past_days_of_week() {
        // Monday of the current week is in the past but still ThisWeek
        assert_eq!(classify_due_date(Some(&at(2024, 5, 13, 9)), &now()), DueBucket::ThisWeek);
        assert_eq!(classify_due_date(Some(&at(2024, 5, 19, 9)), &now()), DueBucket::ThisWeek);
    }

    #[test]
    fn test_overdue_before_current_week() {
        assert_eq!(classify_due_date(Some(&at(2024, 5, 12, 23)), &now()), DueBucket::Overdue);
        assert_eq!(classify_due_date(Some(&at(2023, 1, 1, 0)), &now()), DueBucket::Overdue);
    }

    #[test]
    fn test_later_after_current_week() {
        assert_eq!(classify_due_date(Some(&at(2024, 5, 20, 0)), &now()), DueBucket::Later);
    }

    #[test]
    fn test_sunday_tomorrow_wins_over_next_week() {
        // Sunday: Monday is tomorrow even though it starts a new week
        let sunday = at(2024, 5, 19, 10);
        assert_eq!(classify_due_date(Some(&at(2024, 5, 20, 8)), &sunday), DueBucket::Tomorrow);
        assert_eq!(classify_due_date(Some(&at(2024, 5, 21, 8)), &sunday), DueBucket::Later);
    }

    #[test]
    fn test_calendar_day_follows_now_timezone() {
        // 23:30 UTC on the 15th is already the 16th at UTC+2
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_now = plus_two.with_ymd_and_hms(2024, 5, 16, 8, 0, 0).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 5, 15, 23, 30, 0).unwrap();
        assert_eq!(classify_due_date(Some(&due), &local_now), DueBucket::Today);
    }

    #[test]
    fn test_group_tasks_by_due_date() {
        let tasks = vec![
            task_due("later", Some(at(2024, 6, 30, 9))),
            task_due("none", None),
            task_due("today", Some(at(2024, 5, 15, 18))),
            task_due("old", Some(at(2024, 4, 1, 9))),
            task_due("today 2", Some(at(2024, 5, 15, 8))),
        ];

        let groups = group_tasks_by_due_date(&tasks, &now());
        let buckets: Vec<_> = groups.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            buckets,
            vec![DueBucket::Overdue, DueBucket::Today, DueBucket::Later, DueBucket::NoDueDate]
        );

        let today: Vec<_> = groups[1].1.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(today, vec!["today", "today 2"]);
    }

    #[test]
    fn test_group_empty_list() {
        let groups = group_tasks_by_due_date(&[], &now());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_completion_badge() {
        let mut task = task_due("t", None);
        assert_eq!(completion_badge(&task), "[ ]");
        task.toggle();
        assert_eq!(completion_badge(&task), "[x]");
    }

    #[test]
    fn test_tree_connector() {
        assert_eq!(tree_connector(false), "├─");
        assert_eq!(tree_connector(true), "└─");
    }
}
