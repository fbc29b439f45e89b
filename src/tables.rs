use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use duke_energy::{ApiError, Meter, MeterType};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

const fn kind_color(kind: &MeterType) -> Color {
    match kind {
        MeterType::Electric => Color::Yellow,
        MeterType::Gas => Color::Blue,
        MeterType::Other(_) => Color::DarkGrey,
    }
}

pub fn build_meters_table(meters: &[Meter]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Type", "ID", "Start date", "Update interval"]);
    for meter in meters {
        table.add_row(vec![
            Cell::new(meter.kind()).fg(kind_color(meter.kind())),
            Cell::new(meter.id()),
            Cell::new(meter.start_date()).add_attribute(Attribute::Dim),
            Cell::new(format!("{} min", meter.update_interval().num_minutes()))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_usage_table(meters: &[Meter]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Type", "ID", "Days billed", "Total", "Average", "Yesterday", "Unit"]);
    for meter in meters {
        table.add_row(vec![
            Cell::new(meter.kind()).fg(kind_color(meter.kind())),
            Cell::new(meter.id()),
            number_cell(meter.days_billed()),
            number_cell(meter.total()),
            number_cell(meter.average()).add_attribute(Attribute::Dim),
            number_cell(meter.usage()),
            Cell::new(meter.unit().ok().flatten().unwrap_or("")),
        ]);
    }
    table
}

fn number_cell<V: ToString>(value: Result<Option<V>, ApiError>) -> Cell {
    match value {
        Ok(Some(value)) => Cell::new(value.to_string()).set_alignment(CellAlignment::Right),
        Ok(None) => Cell::new("–").set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
        Err(_) => Cell::new("unsupported").fg(Color::DarkGrey),
    }
}
