use anstyle::AnsiColor;
use marrow_lib::constants::style_from_fg;
use marrow_lib::constants::ERROR_STYLE;
use marrow_lib::constants::HELP_STYLE;

/// Util function for getting the style for the CLI
#[cfg(not(tarpaulin_include))]
pub fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(style_from_fg(AnsiColor::Yellow).bold())
        .header(style_from_fg(AnsiColor::Green).bold().underline())
        .literal(style_from_fg(AnsiColor::Cyan).bold())
        .invalid(style_from_fg(AnsiColor::Blue).bold())
        .error(ERROR_STYLE)
        .valid(HELP_STYLE)
        .placeholder(style_from_fg(AnsiColor::White))
}

/// Util function: formatting a table for printing
///
/// input: Vec of rows, each row is a Vec of strings (columns)
///
/// output: String
pub fn format_table(data: Vec<Vec<String>>) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut max_widths = vec![0; data[0].len()];
    for row in &data {
        for (i, item) in row.iter().enumerate() {
            max_widths[i] = max_widths[i].max(item.len());
        }
    }

    let mut result = String::new();
    for row in &data {
        for (i, item) in row.iter().enumerate() {
            result.push_str(&format!("{:<width$}  ", item, width = max_widths[i]));
        }
        result = result.trim_end().to_string();
        result.push('\n');
    }

    result
}
