// Text rendering of the results, one bar per option.

use survey_tally::FrequencyTable;

/// The colors of the bars, cycled by option index.
pub const BAR_COLORS: [&str; 6] = [
    "#22c55e", "#3b82f6", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899",
];

/// The width of the longest bar of a question.
const BAR_WIDTH: u64 = 40;

pub fn bar_color(option_idx: usize) -> &'static str {
    BAR_COLORS[option_idx % BAR_COLORS.len()]
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChartView {
    /// The answers could not be fetched.
    Error(String),
    NoQuestions,
    Results {
        title: String,
        tables: Vec<FrequencyTable>,
    },
}

impl ChartView {
    pub fn new(title: &str, tables: &[FrequencyTable]) -> ChartView {
        if tables.is_empty() {
            ChartView::NoQuestions
        } else {
            ChartView::Results {
                title: title.to_string(),
                tables: tables.to_vec(),
            }
        }
    }
}

fn bar_len(count: u64, max_count: u64) -> usize {
    if max_count == 0 {
        0
    } else {
        (count * BAR_WIDTH / max_count) as usize
    }
}

fn render_table(table: &FrequencyTable, out: &mut Vec<String>) {
    out.push(table.question.clone());
    if table.is_empty() {
        out.push("  No options for this question.".to_string());
        return;
    }
    let width = table
        .entries
        .iter()
        .map(|e| e.option.chars().count())
        .max()
        .unwrap_or(0);
    let max_count = table.entries.iter().map(|e| e.count).max().unwrap_or(0);
    for e in table.entries.iter() {
        let bar = "#".repeat(bar_len(e.count, max_count));
        if bar.is_empty() {
            out.push(format!("  {:<width$} {}", e.option, e.count, width = width));
        } else {
            out.push(format!(
                "  {:<width$} {} {}",
                e.option,
                bar,
                e.count,
                width = width
            ));
        }
    }
}

pub fn render_chart(view: &ChartView) -> String {
    match view {
        ChartView::Error(msg) => format!("Error: {}", msg),
        ChartView::NoQuestions => "This survey has no questions yet.".to_string(),
        ChartView::Results { title, tables } => {
            let mut lines: Vec<String> = vec![format!("Survey results: {}", title)];
            for table in tables {
                lines.push(String::new());
                render_table(table, &mut lines);
            }
            lines.join("\n")
        }
    }
}
