use std::fmt::Display;
use std::net::Ipv4Addr;

use colored::*;
use tracing::info;

use crate::terminal::colors;
use crate::terminal::format::Detail;

pub const TOTAL_WIDTH: usize = 64;

/// Width of the key column in settings and detail rows.
const KEY_WIDTH: usize = 11;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("")
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg)
    };
}

/// Lets callers pass either plain text, which gets the default value color,
/// or a value they already colored themselves.
pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

pub fn print(msg: &str) {
    info!(target: "sshsweep::print", raw_msg = msg);
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title = format!(" sshsweep {} ", env!("CARGO_PKG_VERSION"));
    print(&framed(&title, '═'));
    print(&format!(
        "{}",
        "  who lets this credential in?".color(colors::SEPARATOR).italic()
    ));
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    print(&framed(&format!(" {} ", msg.to_uppercase()), '─'));
}

/// Pads `title` on both sides with `fill` up to [`TOTAL_WIDTH`] columns.
fn framed(title: &str, fill: char) -> String {
    let spare = TOTAL_WIDTH.saturating_sub(console::measure_text_width(title));
    let left = spare / 2;
    let right = spare - left;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left).color(colors::SEPARATOR),
        title.bright_green().bold(),
        fill.to_string().repeat(right).color(colors::SEPARATOR)
    )
}

pub fn fat_separator() {
    print(&format!("{}", "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)));
}

/// One `key ....: value` row of the settings block.
pub fn setting<V>(key: &str, value: V)
where
    V: Display + WithDefaultColor,
{
    let dots = ".".repeat(KEY_WIDTH.saturating_sub(key.len()) + 1);
    print(&format!(
        "{} {}{}{} {}",
        ">".color(colors::SEPARATOR),
        key.color(colors::PRIMARY),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR),
        value.with_default(colors::TEXT_DEFAULT)
    ));
}

/// A reachable host and the rows describing it:
///
/// ```text
/// #1  192.168.1.20
///     ├─ login .....: ssh admin@192.168.1.20
///     └─ port ......: 22
/// ```
pub fn device(idx: usize, addr: Ipv4Addr, rows: &[Detail]) {
    let number = format!("{:<4}", format!("#{}", idx + 1));
    print(&format!(
        "{}{}",
        number.color(colors::ACCENT),
        addr.to_string().color(colors::IPV4_ADDR).bold()
    ));
    detail_rows(rows, 4);
}

/// Prints `rows` as branches indented by `indent` columns.
pub fn detail_rows(rows: &[Detail], indent: usize) {
    let pad = " ".repeat(indent);
    for (i, (key, value)) in rows.iter().enumerate() {
        let branch = if i + 1 < rows.len() { "├─" } else { "└─" };
        let dots = ".".repeat(KEY_WIDTH.saturating_sub(key.len()) + 1);
        print(&format!(
            "{pad}{} {} {}{} {}",
            branch.color(colors::SEPARATOR),
            key.to_lowercase().color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

pub fn centered(msg: &str) {
    let spare = TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg));
    print(&format!("{}{}", " ".repeat(spare / 2), msg));
}

const NO_RESULTS_0: &str = r#"
          _   _  ___    ____  _______     _____ ____ _____ ____
         | \ | |/ _ \  |  _ \| ____\ \   / /_ _/ ___| ____/ ___|
         |  \| | | | | | | | |  _|  \ \ / / | | |   |  _| \___ \
         | |\  | |_| | | |_| | |___  \ V /  | | |___| |___ ___) |
         |_| \_|\___/  |____/|_____|  \_/  |___\____|_____|____/
"#;

pub fn no_results() {
    print(&format!("{}", NO_RESULTS_0.red().bold()));
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
