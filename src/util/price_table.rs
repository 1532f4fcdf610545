//! Tabular rendering of part prices.
//!
//! A [`PriceTable`] is built once from a quotation's parts. Its columns are the
//! two fixed columns (part name, MOQ) followed by one column per distinct tier
//! quantity found across all parts, sorted ascending. A part that has no tier at
//! a given quantity shows [`PLACEHOLDER`] in that column.
//!
//! The same grid can be emitted as a fixed-width text block, as row-major cells
//! for grid-oriented document APIs, or as HTML table markup.

use rust_decimal::prelude::*;
use rusty_money::{iso, Money};
use std::fmt::Write;

use crate::model::quotation::Part;

/// Output for a quotation without parts.
pub const NO_DATA: &str = "No parts data available";
/// Cell content for a quantity tier a part does not price.
pub const PLACEHOLDER: &str = "-";

const PART_NAME_HEADER: &str = "Part Name";
const MOQ_HEADER: &str = "MOQ";
/// Fits `$999,999,999.99` plus padding.
const PRICE_COLUMN_WIDTH: usize = 15;
/// One space on each side of the cell content.
const CELL_PADDING: usize = 2;
/// Columns always present before the quantity tiers.
const FIXED_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceTable {
    /// No parts at all.
    Empty,
    Grid(PriceGrid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PriceTable {
    pub fn from_parts(parts: &[Part]) -> Self {
        if parts.is_empty() {
            return PriceTable::Empty;
        }

        let quantities = distinct_quantities(parts);

        let mut header = Vec::with_capacity(FIXED_COLUMNS + quantities.len());
        header.push(PART_NAME_HEADER.to_string());
        header.push(MOQ_HEADER.to_string());
        header.extend(quantities.iter().map(|quantity| format!("Price ({quantity})")));

        let rows = parts
            .iter()
            .map(|part| {
                let mut row = Vec::with_capacity(header.len());
                row.push(part.part_name.clone());
                row.push(part.moq.to_string());
                row.extend(quantities.iter().map(|&quantity| {
                    part.price_at(quantity)
                        .map(format_price)
                        .unwrap_or_else(|| PLACEHOLDER.to_string())
                }));
                row
            })
            .collect();

        PriceTable::Grid(PriceGrid { header, rows })
    }

    pub fn column_count(&self) -> usize {
        match self {
            PriceTable::Empty => 1,
            PriceTable::Grid(grid) => grid.header.len(),
        }
    }

    /// Header row followed by data rows, flattened row-major.
    pub fn cells(&self) -> Vec<String> {
        match self {
            PriceTable::Empty => vec![NO_DATA.to_string()],
            PriceTable::Grid(grid) => grid
                .header
                .iter()
                .chain(grid.rows.iter().flatten())
                .cloned()
                .collect(),
        }
    }

    /// Fixed-width text table bordered with `+`, `-` and `|`.
    pub fn to_text(&self) -> String {
        let grid = match self {
            PriceTable::Empty => return NO_DATA.to_string(),
            PriceTable::Grid(grid) => grid,
        };

        let widths = grid.column_widths();
        let border = border_line(&widths);

        let mut out = String::new();
        out.push_str(&border);
        out.push_str(&text_row(&grid.header, &widths, |_| Align::Left));
        out.push_str(&border);
        for row in &grid.rows {
            out.push_str(&text_row(row, &widths, column_align));
        }
        out.push_str(&border);
        out
    }

    pub fn to_html(&self) -> String {
        let grid = match self {
            PriceTable::Empty => return format!("<p>{NO_DATA}</p>"),
            PriceTable::Grid(grid) => grid,
        };

        let mut out = String::from("<table class=\"price-table\">\n<thead>\n<tr>");
        for label in &grid.header {
            let _ = write!(out, "<th>{}</th>", escape_html(label));
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &grid.rows {
            out.push_str("<tr>");
            for (column, value) in row.iter().enumerate() {
                let class = match column_align(column) {
                    Align::Left => "text",
                    Align::Right => "number",
                };
                let _ = write!(out, "<td class=\"{class}\">{}</td>", escape_html(value));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>");
        out
    }
}

impl PriceGrid {
    /// Widths including padding, computed across every row so all rows align.
    fn column_widths(&self) -> Vec<usize> {
        self.header
            .iter()
            .enumerate()
            .map(|(column, label)| {
                let longest = self
                    .rows
                    .iter()
                    .map(|row| display_len(&row[column]))
                    .chain(std::iter::once(display_len(label)))
                    .max()
                    .unwrap_or(0);
                let width = longest + CELL_PADDING;
                if column < FIXED_COLUMNS {
                    width
                } else {
                    width.max(PRICE_COLUMN_WIDTH)
                }
            })
            .collect()
    }
}

/// Formats a unit price as `$1,234.50`, rounding half away from zero.
///
/// Amounts beyond the `Decimal` range are formatted from the float itself.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let Some(amount) = Decimal::from_f64_retain(price) else {
        return format_wide_price(price);
    };
    let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);
    Money::from_decimal(amount, iso::USD).to_string()
}

fn format_wide_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if price.is_sign_negative() { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn distinct_quantities(parts: &[Part]) -> Vec<f64> {
    let mut quantities: Vec<f64> = parts
        .iter()
        .flat_map(|part| part.price_quantities.iter().map(|tier| tier.quantity))
        .collect();
    quantities.sort_by(f64::total_cmp);
    quantities.dedup();
    quantities
}

fn column_align(column: usize) -> Align {
    if column == 0 {
        Align::Left
    } else {
        Align::Right
    }
}

fn display_len(value: &str) -> usize {
    value.chars().count()
}

fn border_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width));
        line.push('+');
    }
    line.push('\n');
    line
}

fn text_row(cells: &[String], widths: &[usize], align: impl Fn(usize) -> Align) -> String {
    let mut line = String::from("|");
    for (column, (value, &width)) in cells.iter().zip(widths).enumerate() {
        let inner = width - CELL_PADDING;
        let _ = match align(column) {
            Align::Left => write!(line, " {value:<inner$} |"),
            Align::Right => write!(line, " {value:>inner$} |"),
        };
    }
    line.push('\n');
    line
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quotation::PriceTier;

    fn part(name: &str, moq: u32, tiers: &[(f64, f64)]) -> Part {
        Part {
            part_name: name.to_string(),
            moq,
            price_quantities: tiers
                .iter()
                .map(|&(quantity, price)| PriceTier { quantity, price })
                .collect(),
        }
    }

    fn sample() -> Vec<Part> {
        vec![
            part("Hex Bolt", 500, &[(10.0, 1.25), (50.0, 1.1)]),
            part("Flange", 20, &[(50.0, 1234.5), (100.0, 1000.0)]),
        ]
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1234.5), "$1,234.50");
        assert_eq!(format_price(0.5), "$0.50");
        assert_eq!(format_price(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_price(0.125), "$0.13");
        assert_eq!(format_price(f64::NAN), PLACEHOLDER);
    }

    #[test]
    fn test_price_beyond_decimal_range_is_still_rendered() {
        let formatted = format_price(1e29);
        assert_eq!(formatted, "$99,999,999,999,999,991,433,150,857,216.00");

        let table = PriceTable::from_parts(&[part("X", 1, &[(10.0, 1e29)])]);
        let cells = table.cells();
        assert_eq!(cells[5], formatted);
        assert_ne!(cells[5], PLACEHOLDER);
        assert!(table.to_text().contains(&formatted));
    }

    #[test]
    fn test_empty_input_yields_no_data() {
        let table = PriceTable::from_parts(&[]);
        assert_eq!(table, PriceTable::Empty);
        assert_eq!(table.to_text(), NO_DATA);
        assert_eq!(table.cells(), vec![NO_DATA.to_string()]);
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.to_html(), "<p>No parts data available</p>");
    }

    #[test]
    fn test_column_set_is_sorted_union() {
        let table = PriceTable::from_parts(&sample());
        assert_eq!(table.column_count(), 5);

        let cells = table.cells();
        assert_eq!(
            &cells[..5],
            &["Part Name", "MOQ", "Price (10)", "Price (50)", "Price (100)"]
        );
        assert_eq!(&cells[5..10], &["Hex Bolt", "500", "$1.25", "$1.10", "-"]);
        assert_eq!(&cells[10..15], &["Flange", "20", "-", "$1,234.50", "$1,000.00"]);
    }

    #[test]
    fn test_text_table_layout() {
        let text = PriceTable::from_parts(&sample()).to_text();
        let expected = "\
+-----------+-----+---------------+---------------+---------------+
| Part Name | MOQ | Price (10)    | Price (50)    | Price (100)   |
+-----------+-----+---------------+---------------+---------------+
| Hex Bolt  | 500 |         $1.25 |         $1.10 |             - |
| Flange    |  20 |             - |     $1,234.50 |     $1,000.00 |
+-----------+-----+---------------+---------------+---------------+
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_rows_align() {
        let text = PriceTable::from_parts(&sample()).to_text();
        let lengths: Vec<usize> = text.lines().map(|line| line.chars().count()).collect();
        assert!(lengths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_parts_without_tiers_keep_fixed_columns() {
        let table = PriceTable::from_parts(&[part("Washer", 1000, &[]), part("Nut", 5, &[])]);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cells().len(), 6);
        let expected = "\
+-----------+------+
| Part Name | MOQ  |
+-----------+------+
| Washer    | 1000 |
| Nut       |    5 |
+-----------+------+
";
        assert_eq!(table.to_text(), expected);
    }

    #[test]
    fn test_long_price_widens_its_column() {
        let table = PriceTable::from_parts(&[part("Press", 1, &[(1.0, 123_456_789_012.0)])]);
        let text = table.to_text();
        assert!(text.contains("| $123,456,789,012.00 |"));
        let lengths: Vec<usize> = text.lines().map(str::len).collect();
        assert!(lengths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_fractional_quantity_label() {
        let table = PriceTable::from_parts(&[part("Resin", 1, &[(2.5, 4.0)])]);
        assert_eq!(table.cells()[2], "Price (2.5)");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let parts = sample();
        assert_eq!(
            PriceTable::from_parts(&parts).to_text(),
            PriceTable::from_parts(&parts).to_text()
        );
        assert_eq!(
            PriceTable::from_parts(&parts).to_html(),
            PriceTable::from_parts(&parts).to_html()
        );
    }

    #[test]
    fn test_html_escapes_and_keeps_placeholders() {
        let table = PriceTable::from_parts(&[
            part("<Gear & Co>", 3, &[(10.0, 2.0)]),
            part("Spring", 7, &[(20.0, 3.0)]),
        ]);
        let html = table.to_html();
        assert!(html.contains("<th>Part Name</th><th>MOQ</th><th>Price (10)</th><th>Price (20)</th>"));
        assert!(html.contains("&lt;Gear &amp; Co&gt;"));
        assert!(html.contains("<td class=\"number\">-</td>"));
        assert_eq!(html.matches("<tr>").count(), 3);
    }
}
