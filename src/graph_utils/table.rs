use serde_json::Value;

use super::graph::RecordView;

pub const NULL_CELL: &str = "null";
pub const EMPTY_MESSAGE: &str = "No results to display.";

/// Tabular view of a record set. Columns come from the first record; later
/// records missing one of those keys show `null` in that cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn from_records(records: &[Value]) -> Self {
        let columns: Vec<String> = match records.first().and_then(Value::as_object) {
            Some(first) => first.keys().cloned().collect(),
            None => return Self::default(),
        };
        let rows = records
            .iter()
            .map(|record| columns.iter().map(|c| cell(record.field(c))).collect())
            .collect();
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fixed-width text rendering for terminals.
    pub fn render_text(&self) -> String {
        if self.is_empty() {
            return EMPTY_MESSAGE.to_string();
        }
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(c.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };
        let sep = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(line(&self.columns));
        out.push(sep);
        for row in &self.rows {
            out.push(line(row));
        }
        out.join("\n")
    }
}

/// `null` marks only a JSON null or a missing column. Falsy values such as
/// `0`, `false` and `""` are printed as themselves, not collapsed to `null`.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_CELL.to_string(),
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| NULL_CELL.to_string()),
    }
}
