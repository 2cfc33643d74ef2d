use crate::domain::campaign::Campaign;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CampaignRow {
    campaign: u64,
    status: &'static str,
    goal: String,
    current: String,
    progress: String,
    featured: bool,
}

impl From<&Campaign> for CampaignRow {
    fn from(c: &Campaign) -> Self {
        Self {
            campaign: c.id.0,
            status: c.status().as_str(),
            goal: c.goal_amount.to_string(),
            current: c.current_amount().to_string(),
            progress: format!("{:.2}", c.progress_percentage()),
            featured: c.is_featured,
        }
    }
}

/// Writes campaign ledgers as CSV:
/// `campaign,status,goal,current,progress,featured`.
pub struct CampaignWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CampaignWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_campaigns(&mut self, campaigns: &[Campaign]) -> Result<()> {
        for campaign in campaigns {
            self.writer.serialize(CampaignRow::from(campaign))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
