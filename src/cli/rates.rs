use super::ui;
use crate::core::RatesPayload;
use comfy_table::Cell;

impl RatesPayload {
    /// Renders the quotes for `display_currencies`, in that order, skipping
    /// codes the table does not have. An empty list shows every quote.
    pub fn display_as_table(&self, display_currencies: &[String]) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Name"),
            ui::header_cell("Buying (Sight)"),
            ui::header_cell("Buying (Transfer)"),
            ui::header_cell("Selling"),
            ui::header_cell("Average"),
        ]);

        let quotes: Vec<_> = if display_currencies.is_empty() {
            self.rates.quotes().collect()
        } else {
            display_currencies
                .iter()
                .filter_map(|code| self.rates.get(code))
                .collect()
        };

        for quote in quotes {
            table.add_row(vec![
                Cell::new(&quote.code),
                Cell::new(&quote.name),
                ui::rate_cell(quote.buying_sight),
                ui::rate_cell(quote.buying_transfer),
                ui::rate_cell(quote.selling),
                ui::rate_cell(quote.average),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Exchange Rates (THB per unit)", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\nLast updated: {}\n{}",
            ui::style_text(&self.last_updated, ui::provenance_style(self.provenance)),
            ui::style_text(
                "Rates are subject to change without notice and include a markup.",
                ui::StyleType::Subtle
            )
        ));
        output
    }
}
