use console::{style, Term};
use serde::Serialize;

pub fn print_success(msg: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("✓").green().bold(), msg));
}

pub fn print_error(msg: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!("{} {}", style("✗").red().bold(), msg));
}

pub fn print_warning(msg: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("!").yellow().bold(), msg));
}

pub fn print_info(msg: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("•").cyan(), msg));
}

pub fn print_heading(msg: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&style(msg).bold().underlined().to_string());
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("  {}: {}", style(key).dim(), value));
}

/// Print output as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(data).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
