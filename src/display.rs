//! Terminal output for the one-shot commands
//!
//! The monitor itself only logs. `status` and `login` print through
//! [`DisplayManager`], either as colored text or as pretty JSON.

use crate::models::{ConsumptionSnapshot, ConsumptionSummary};
use colored::Colorize;
use std::fmt::Write as _;

pub struct DisplayManager {
    threshold_gb: f64,
}

impl DisplayManager {
    pub fn new(threshold_gb: f64) -> Self {
        Self { threshold_gb }
    }

    pub fn display_summary(&self, summary: &ConsumptionSummary, json_output: bool) {
        if json_output {
            match serde_json::to_string_pretty(summary) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing consumption summary to JSON: {}", e),
            }
            return;
        }

        print!("{}", self.render_summary(summary));
    }

    pub fn display_login(&self, account_id: &str, contract_id: Option<&str>) {
        println!(
            "{} Logged in as {}",
            "✅".bright_green(),
            account_id.bright_white().bold()
        );
        if let Some(contract_id) = contract_id {
            println!("   Contract: {}", contract_id.bright_cyan());
        }
    }

    pub fn render_summary(&self, summary: &ConsumptionSummary) -> String {
        let snapshot = &summary.snapshot;
        let mut out = String::new();

        let _ = writeln!(out, "\n{}", "=".repeat(60).bright_cyan());
        let _ = writeln!(
            out,
            "{} {}",
            "Contract".bright_white().bold(),
            summary.contract_id.bright_white().bold()
        );
        let _ = writeln!(out, "{}", "=".repeat(60).bright_cyan());

        if snapshot.has_allowance() {
            let _ = writeln!(
                out,
                "\n{} High-speed volume: {} of {} used ({}%)",
                "📶".bright_blue(),
                format!("{:.2} GB", snapshot.consumed_gb).bright_white().bold(),
                format!("{:.2} GB", snapshot.limit_gb).bright_white(),
                format!("{:.1}", snapshot.consumed_percent()).bright_yellow()
            );
            let _ = writeln!(out, "   Remaining: {}", self.remaining_label(snapshot));
        } else {
            let _ = writeln!(out, "\n{} No high-speed allowance reported", "📶".bright_blue());
        }

        let refill = if snapshot.can_refill {
            "available".bright_green()
        } else {
            "not available".bright_red()
        };
        let _ = writeln!(out, "   Refill: {}", refill);
        let _ = writeln!(
            out,
            "   Updated: {}",
            snapshot
                .updated_at
                .with_timezone(&chrono::Local)
                .format("%d.%m.%Y %H:%M:%S")
                .to_string()
                .bright_white()
        );
        let _ = writeln!(out, "   Resets on day {} of the month", summary.reset_day);

        if !summary.refill_packages.is_empty() {
            let _ = writeln!(
                out,
                "\n{} Refill packages this period: {}",
                "📦".bright_yellow(),
                summary.refill_packages.len().to_string().bright_white().bold()
            );
            for package in &summary.refill_packages {
                let _ = writeln!(
                    out,
                    "   {} of {} used",
                    format!("{:.2} GB", package.used_gb).bright_white(),
                    format!("{:.2} GB", package.total_gb).bright_white()
                );
            }
        }

        let telephony = if summary.telephony.is_flat_rate {
            "flat rate".bright_green().to_string()
        } else {
            format!("{:.1} min", summary.telephony.consumed_minutes()).bright_white().to_string()
        };
        let messages = if summary.messages.is_flat_rate {
            "flat rate".bright_green().to_string()
        } else {
            summary.messages.count.to_string().bright_white().to_string()
        };
        let _ = writeln!(out, "\n{} Telephony: {}", "📞".bright_blue(), telephony);
        let _ = writeln!(out, "{} Messages: {}", "✉️".bright_blue(), messages);

        if let Some(costs) = &summary.total_costs {
            let _ = writeln!(
                out,
                "{} Costs: {}",
                "💶".bright_yellow(),
                format!("{} {}", costs.amount, costs.currency).bright_green().bold()
            );
        }

        out
    }

    fn remaining_label(&self, snapshot: &ConsumptionSnapshot) -> String {
        let label = format!("{:.2} GB", snapshot.display_remaining_gb());
        if snapshot.is_below(self.threshold_gb) {
            format!("{} (below {:.2} GB threshold)", label.bright_red().bold(), self.threshold_gb)
        } else {
            label.bright_green().bold().to_string()
        }
    }
}
