use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::console::Section;

use super::styling::Outcome;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn status_cell(section: &Section) -> Cell {
    let outcome = Outcome::of(section);
    let cell = Cell::new(outcome.label());
    match outcome.table_color() {
        Some(color) => cell.fg(color),
        None => cell,
    }
}

pub fn color_coded_duration_cell(seconds: f64) -> Cell {
    let minutes = seconds / 60.0;
    let text = crate::console::humanize(std::time::Duration::from_secs_f64(seconds.max(0.0)));
    if minutes <= 10.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if minutes <= 15.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}
