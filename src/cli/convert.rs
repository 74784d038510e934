use super::ui;
use crate::core::ConversionResult;

impl ConversionResult {
    pub fn display(&self) -> String {
        format!(
            "{} {} = {} {}\n{}\n{}",
            format_amount(self.amount),
            self.from_currency,
            ui::style_text(&format_amount(self.converted_amount), ui::StyleType::Value),
            ui::style_text(&self.to_currency, ui::StyleType::Label),
            ui::style_text(
                &format!(
                    "1 {} = {:.4} {}",
                    self.rate_info.from, self.rate_info.rate, self.rate_info.to
                ),
                ui::StyleType::Subtle
            ),
            ui::style_text(
                &format!("Last updated: {}", self.last_updated),
                ui::StyleType::Subtle
            ),
        )
    }
}

fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}
