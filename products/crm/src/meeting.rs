use serde::Deserialize;

/// Meeting details that may ride along with a marketing followup.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "meetingDate")]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// A payload with every field present and non-blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompleteMeeting {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl MeetingPayload {
    /// Incomplete payloads yield `None` and are dropped without error.
    pub fn complete(&self) -> Option<CompleteMeeting> {
        Some(CompleteMeeting {
            title: filled(&self.title)?,
            date: filled(&self.date)?,
            start_time: filled(&self.start_time)?,
            end_time: filled(&self.end_time)?,
        })
    }
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
