//! Terminal table rendering.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::domain::models::Case;

/// Render cases as a table for `case list`.
pub fn format_case_table(cases: &[Case]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Case", "Amount", "Status", "Stage", "Decision", "Confidence", "Cost", "Review",
        ]);

    for case in cases {
        table.add_row(vec![
            Cell::new(&case.id),
            Cell::new(format!("{:.2} {}", case.amount, case.currency)),
            Cell::new(case.status.as_str()),
            Cell::new(case.current_stage.map_or("-", |s| s.as_str())),
            Cell::new(case.final_decision.map_or("-", |v| v.as_str())),
            Cell::new(
                case.decision_confidence
                    .map_or_else(|| "-".to_string(), |c| format!("{c:.2}")),
            ),
            Cell::new(format!("{:.2}", case.total_cost)),
            Cell::new(if case.human_review { "yes" } else { "" }),
        ]);
    }

    table.to_string()
}
