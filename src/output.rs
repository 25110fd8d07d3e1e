use crate::domain::{completion_badge, tree_connector, DueBucket, Folder, Selection, Task, TaskList, User};
use chrono::{DateTime, Local, Utc};

fn marker(active: bool) -> &'static str {
    if active {
        "*"
    } else {
        " "
    }
}

/// Format a due date in the local calendar
pub fn format_due(due: &DateTime<Utc>) -> String {
    due.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn task_line(task: &Task) -> String {
    let mut line = format!("{} {}  ({})", completion_badge(task), task.name, task.id);
    if let Some(due) = &task.due_date {
        line.push_str(&format!("  due {}", format_due(due)));
    }
    line
}

pub fn render_users(users: &[User], current: Option<&str>) -> String {
    if users.is_empty() {
        return "No users yet. Create one with `taskfolio user add <name>`.\n".to_string();
    }
    users
        .iter()
        .map(|u| format!("{} {}  ({})\n", marker(current == Some(u.id.as_str())), u.name, u.id))
        .collect()
}

pub fn render_folders(folders: &[Folder], selection: &Selection) -> String {
    if folders.is_empty() {
        return "No folders.\n".to_string();
    }
    folders
        .iter()
        .map(|f| {
            format!(
                "{} {} {}  ({}) - {} lists\n",
                marker(selection.folder_id() == Some(f.id.as_str())),
                f.emoji,
                f.name,
                f.id,
                f.lists.len()
            )
        })
        .collect()
}

pub fn render_lists(lists: &[TaskList], selection: &Selection) -> String {
    if lists.is_empty() {
        return "No lists.\n".to_string();
    }
    lists
        .iter()
        .map(|l| {
            format!(
                "{} {}  ({}) - {}/{} open\n",
                marker(selection.list_id() == Some(l.id.as_str())),
                l.name,
                l.id,
                l.open_count(),
                l.tasks.len()
            )
        })
        .collect()
}

/// Render bucketed tasks under their headings
pub fn render_grouped_tasks(groups: &[(DueBucket, Vec<&Task>)]) -> String {
    if groups.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut output = String::new();
    for (bucket, tasks) in groups {
        output.push_str(&format!("## {}\n", bucket.label()));
        for task in tasks {
            output.push_str(&format!("  {}\n", task_line(task)));
            if !task.description.trim().is_empty() {
                for line in task.description.lines() {
                    output.push_str(&format!("      {}\n", line));
                }
            }
        }
    }
    output
}

/// Render a user's whole subtree
pub fn render_tree(user: &User) -> String {
    let mut output = format!("{}  ({})\n", user.name, user.id);
    let folder_count = user.folders.len();
    for (fi, folder) in user.folders.iter().enumerate() {
        let last_folder = fi + 1 == folder_count;
        output.push_str(&format!(
            "{} {} {}  ({})\n",
            tree_connector(last_folder),
            folder.emoji,
            folder.name,
            folder.id
        ));
        let folder_indent = if last_folder { "   " } else { "│  " };

        let list_count = folder.lists.len();
        for (li, list) in folder.lists.iter().enumerate() {
            let last_list = li + 1 == list_count;
            output.push_str(&format!(
                "{}{} {}  ({})\n",
                folder_indent,
                tree_connector(last_list),
                list.name,
                list.id
            ));
            let list_indent = if last_list { "   " } else { "│  " };

            let task_count = list.tasks.len();
            for (ti, task) in list.tasks.iter().enumerate() {
                output.push_str(&format!(
                    "{}{}{} {}\n",
                    folder_indent,
                    list_indent,
                    tree_connector(ti + 1 == task_count),
                    task_line(task)
                ));
            }
        }
    }
    output
}
