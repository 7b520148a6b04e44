//! Terminal rendering helpers shared by every subcommand.

use std::io::IsTerminal;

use owo_colors::OwoColorize;
use owo_colors::Style;
use serde::Serialize;
use vantalu_core::model::{Dish, DishType, OrderStatus};

/// Styles used for human output. Every style is a no-op when stdout is
/// not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    bold: Style,
    dimmed: Style,
    green: Style,
    yellow: Style,
    cyan: Style,
    magenta: Style,
    red: Style,
}

impl Palette {
    pub fn new(with_ansi: bool) -> Self {
        if with_ansi {
            Self {
                bold: Style::new().bold(),
                dimmed: Style::new().dimmed(),
                green: Style::new().green(),
                yellow: Style::new().yellow(),
                cyan: Style::new().cyan(),
                magenta: Style::new().magenta(),
                red: Style::new().red(),
            }
        } else {
            Self {
                bold: Style::new(),
                dimmed: Style::new(),
                green: Style::new(),
                yellow: Style::new(),
                cyan: Style::new(),
                magenta: Style::new(),
                red: Style::new(),
            }
        }
    }

    pub fn detect() -> Self {
        Self::new(std::io::stdout().is_terminal())
    }

    pub fn heading(&self, text: &str) -> String {
        text.style(self.bold).to_string()
    }

    pub fn dim(&self, text: &str) -> String {
        text.style(self.dimmed).to_string()
    }

    pub fn success(&self, text: &str) -> String {
        text.style(self.green).to_string()
    }

    pub fn failure(&self, text: &str) -> String {
        text.style(self.red).to_string()
    }

    /// Status badge, e.g. `[Out for delivery]`.
    pub fn status(&self, status: OrderStatus) -> String {
        let style = match status {
            OrderStatus::Placed => self.cyan,
            OrderStatus::Confirmed | OrderStatus::Preparing => self.yellow,
            OrderStatus::OutForDelivery => self.magenta,
            OrderStatus::Delivered => self.green,
            OrderStatus::Cancelled => self.red,
        };
        format!("[{}]", status.label()).style(style).to_string()
    }

    pub fn dish_type(&self, kind: DishType) -> String {
        match kind {
            DishType::Veg => "veg".style(self.green).to_string(),
            DishType::Nonveg => "non-veg".style(self.red).to_string(),
        }
    }
}

pub fn rupees(amount: impl Into<u64>) -> String {
    format!("₹{}", amount.into())
}

/// `[8 chars]` id prefix used in lists.
pub fn short(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Text progress bar over the four tracking stages.
pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 10;
    format!("{}{} {percent}%", "#".repeat(filled), "-".repeat(10 - filled))
}

/// One menu line: id, name, Telugu name, type and price.
pub fn dish_line(palette: &Palette, dish: &Dish) -> String {
    let telugu = dish
        .telugu
        .as_deref()
        .map(|t| format!(" ({t})"))
        .unwrap_or_default();
    let popular = if dish.popular { " *" } else { "" };
    format!(
        "{:>4}  {}{}{}  {}  {}",
        dish.id,
        palette.heading(&dish.name),
        palette.dim(&telugu),
        popular,
        palette.dish_type(dish.dish_type),
        rupees(dish.price),
    )
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
