use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use calc_share_core::{AvailableImport, CalculatorRegistry, ShareSettings, SharedField};
use calc_share_cli::inspect::{ConnectionRow, StoredRow};

pub fn fields_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Label"),
        header_cell("Kind"),
    ]);
    apply_table_style(&mut table);
    for field in SharedField::ALL {
        table.add_row(vec![
            Cell::new(field.key()),
            Cell::new(field.label()),
            dim_cell(format!("{:?}", field.kind()).to_lowercase()),
        ]);
    }
    table
}

pub fn calculators_table(registry: &CalculatorRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Calculator"),
        header_cell("Name"),
        header_cell("Imports"),
        header_cell("Exports"),
    ]);
    apply_table_style(&mut table);
    for config in registry.iter() {
        table.add_row(vec![
            Cell::new(&config.id).fg(Color::Green),
            Cell::new(&config.name),
            field_list_cell(&config.imports),
            field_list_cell(&config.exports),
        ]);
    }
    table
}

pub fn connections_table(rows: &[ConnectionRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Calculator"),
        header_cell("Name"),
        header_cell("Shared fields"),
    ]);
    apply_table_style(&mut table);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.id).fg(Color::Green),
            Cell::new(&row.name),
            field_list_cell(&row.shared),
        ]);
    }
    table
}

pub fn stored_table(rows: &[StoredRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Value"),
        header_cell("Source"),
        header_cell("Saved"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.key),
            Cell::new(row.label),
            Cell::new(&row.value).add_attribute(Attribute::Bold),
            Cell::new(&row.source_name),
            dim_cell(&row.saved),
        ]);
    }
    table
}

pub fn imports_table(imports: &[AvailableImport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Value"),
        header_cell("From"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for import in imports {
        table.add_row(vec![
            Cell::new(import.label),
            Cell::new(import.entry.value).add_attribute(Attribute::Bold),
            Cell::new(&import.entry.source_name),
        ]);
    }
    table
}

pub fn settings_table(settings: &ShareSettings) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Setting"), header_cell("Value")]);
    apply_table_style(&mut table);
    let data_dir = match &settings.data_dir {
        Some(dir) => Cell::new(dir.display()),
        None => dim_cell(format!("{} (default)", settings.resolved_data_dir().display())),
    };
    table.add_row(vec![Cell::new("storage_key"), Cell::new(&settings.storage_key)]);
    table.add_row(vec![Cell::new("data_dir"), data_dir]);
    table.add_row(vec![
        Cell::new("poll_interval_ms"),
        Cell::new(settings.poll_interval_ms),
    ]);
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn field_list_cell(fields: &[SharedField]) -> Cell {
    if fields.is_empty() {
        return dim_cell("-");
    }
    let keys: Vec<&str> = fields.iter().map(SharedField::key).collect();
    Cell::new(keys.join(", "))
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
