//! Console presentation of worker tables

use chrono::Local;

use shared::{ControlAction, ProcessRecord};

use crate::traits::ReportSink;

const HEADERS: [&str; 6] = ["pid", "ppid", "name", "started", "timer", "status"];

/// Prints `allocate` and `statusReply` reports as an aligned table on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct TablePresenter;

impl TablePresenter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportSink for TablePresenter {
    fn present(&self, action: ControlAction, records: &[ProcessRecord]) {
        let title = match action {
            ControlAction::Allocate => "Allocated workers",
            ControlAction::StatusReply => "Worker status",
            other => other.as_str(),
        };
        println!("{title} ({})", records.len());
        print!("{}", render_table(records));
    }
}

/// Render records as a pipe-separated table, one header line plus one line per record
pub fn render_table(records: &[ProcessRecord]) -> String {
    let rows: Vec<[String; 6]> = records
        .iter()
        .map(|r| {
            [
                r.pid.to_string(),
                r.parent_pid.to_string(),
                r.task_name.to_string(),
                r.started_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                r.interval.to_string(),
                r.status().to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, HEADERS.iter().copied(), &widths);
    for row in &rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize; 6]) {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}
