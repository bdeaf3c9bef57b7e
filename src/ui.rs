use std::io::{self, IsTerminal};

use crate::app::RowCheckView;
use crate::domain::entity::{ProjectPlan, Row, Task};

/// Rows wider than this are drawn truncated with a trailing marker.
const MAX_SLOTS: i64 = 64;

pub fn print_plan(plan: &ProjectPlan) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.id(&format!("plan {}", plan.id)),
        palette.heading(&plan.title)
    );
    print_rows_with(&plan.row_list, &palette);
}

pub fn print_rows(rows: &[Row]) {
    print_rows_with(rows, &Palette::auto());
}

pub fn print_row(row: &Row) {
    print_rows_with(std::slice::from_ref(row), &Palette::auto());
}

fn print_rows_with(rows: &[Row], palette: &Palette) {
    if rows.is_empty() {
        println!("{}", palette.dim("no rows"));
        return;
    }
    for row in rows {
        println!(
            "{} {} {}",
            palette.id(&format!("row {}", row.id)),
            row.title,
            palette.slots(&slot_map(row))
        );
        for task in &row.task_list {
            println!("  {}", format_task(task, palette));
        }
    }
}

pub fn print_task(task: &Task) {
    let palette = Palette::auto();
    println!("{}", format_task(task, &palette));
}

pub fn print_tasks(tasks: &[Task]) {
    let palette = Palette::auto();
    if tasks.is_empty() {
        println!("{}", palette.dim("no tasks"));
        return;
    }
    for task in tasks {
        println!("{}", format_task(task, &palette));
    }
    println!("{}", palette.dim(&format!("{} task(s)", tasks.len())));
}

pub fn print_check(report: &RowCheckView) {
    let palette = Palette::auto();
    println!(
        "{} patch is consistent; {} task(s) would change",
        palette.id(&format!("row {}", report.row_id)),
        report.candidates.len()
    );
    for task in &report.candidates {
        println!("  {}", format_task(task, &palette));
    }
}

fn format_task(task: &Task, palette: &Palette) -> String {
    format!(
        "{} {} {}",
        palette.id(&format!("task {}", task.id)),
        palette.dim(&format!("[{}-{}]", task.position, task.last_slot())),
        task.title
    )
}

/// One character per slot: `.` free, a task's marker when one task holds it,
/// `#` when more than one does.
fn slot_map(row: &Row) -> String {
    let end = row
        .task_list
        .iter()
        .map(|task| task.last_slot().saturating_add(1))
        .max()
        .unwrap_or(0);
    let width = end.clamp(0, MAX_SLOTS);

    let mut cells = vec!['.'; usize::try_from(width).unwrap_or(0)];
    for (index, task) in row.task_list.iter().enumerate() {
        let marker = task_marker(index);
        let task_end = task.last_slot().saturating_add(1).min(width);
        for slot in task.position.max(0)..task_end {
            let Ok(cell) = usize::try_from(slot) else {
                continue;
            };
            cells[cell] = if cells[cell] == '.' { marker } else { '#' };
        }
    }

    let mut map: String = cells.into_iter().collect();
    if end > MAX_SLOTS {
        map.push('…');
    }
    format!("|{map}|")
}

fn task_marker(index: usize) -> char {
    const MARKERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    char::from(MARKERS[index % MARKERS.len()])
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn slots(&self, text: &str) -> String {
        self.paint("33", text)
    }
}
