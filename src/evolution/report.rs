use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Numbered table of every stored question, oldest first.
pub fn corpus_table(questions: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("No.").fg(Color::Cyan),
            Cell::new("Question").fg(Color::Cyan),
        ]);

    for (i, question) in questions.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(question)]);
    }

    table
}
