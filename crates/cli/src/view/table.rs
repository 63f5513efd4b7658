/// Left-aligned columns separated by two spaces. The last column is not
/// padded so lines carry no trailing whitespace.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(format_row(headers.iter().copied(), &widths))
        .chain(rows.iter().map(|row| format_row(row.iter().map(String::as_str), &widths)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let cells = cells.collect::<Vec<_>>();
    let last = cells.len().saturating_sub(1);
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, width))| {
            if idx == last {
                cell.to_string()
            } else {
                format!("{:<width$}", cell, width = width)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}
