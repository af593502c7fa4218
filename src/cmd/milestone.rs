//! Milestone block preview: `p4m milestone`.

use anyhow::Result;
use chrono::NaiveDate;
use console::style;
use p4m_client::milestone::milestone_view;

pub fn cmd_milestone(status: &str, end_date: Option<&str>, issues: &[String], today: Option<NaiveDate>) -> Result<()> {
    let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let view = milestone_view(status, end_date, issues, today);
    println!("status:   {}", style(view.status).bold());
    println!("progress: {}%", view.progress);
    println!("layout:   {}", view.layout);
    Ok(())
}
