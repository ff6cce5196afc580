use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::sync::config::load_config;
use crate::sync::paths::resolve_paths;

/// Render a crontab expression for the configured frequency. Frequencies that
/// do not divide an hour or a day evenly fall back to a daily run.
fn cron_expression(frequency_minutes: u64) -> String {
    if frequency_minutes < 60 && 60 % frequency_minutes == 0 {
        return format!("*/{frequency_minutes} * * * *");
    }
    if frequency_minutes % 60 == 0 {
        let hours = frequency_minutes / 60;
        if hours < 24 && 24 % hours == 0 {
            return format!("0 */{hours} * * *");
        }
        if hours == 24 {
            return "0 3 * * *".to_string();
        }
    }
    "0 3 * * *".to_string()
}

/// Registration with the OS scheduler is the operator's job; this command
/// only renders the line to install.
pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("schedule");

    if !cfg.schedule.enabled {
        report.detail("schedule disabled (set schedule.enabled = true in config.toml)");
        return Ok(report);
    }

    let exe = env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "vodsync".to_string());
    let cron = cron_expression(cfg.schedule.frequency_minutes);

    report.detail(format!(
        "frequency_minutes={}",
        cfg.schedule.frequency_minutes
    ));
    report.detail(format!("cron line: {cron} {exe} run"));
    report.detail("install with `crontab -e`");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::cron_expression;

    #[test]
    fn sub_hour_frequencies_use_minute_steps() {
        assert_eq!(cron_expression(15), "*/15 * * * *");
        assert_eq!(cron_expression(30), "*/30 * * * *");
    }

    #[test]
    fn hour_multiples_use_hour_steps() {
        assert_eq!(cron_expression(120), "0 */2 * * *");
        assert_eq!(cron_expression(360), "0 */6 * * *");
    }

    #[test]
    fn daily_and_awkward_frequencies_fall_back_to_one_daily_run() {
        assert_eq!(cron_expression(1440), "0 3 * * *");
        assert_eq!(cron_expression(7), "0 3 * * *");
        assert_eq!(cron_expression(25 * 60), "0 3 * * *");
    }
}
