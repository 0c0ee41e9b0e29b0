/// What a piece of text is about, decided by keyword.
///
/// The same classification picks the canned reply on the producer side and
/// the chart shape on the consumer side, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Revenue,
    Campaign,
    General,
}

impl Topic {
    /// Case-insensitive, first match wins: "revenue" beats "marketing"/"campaign".
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("revenue") {
            Topic::Revenue
        } else if lower.contains("marketing") || lower.contains("campaign") {
            Topic::Campaign
        } else {
            Topic::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Revenue => "revenue",
            Topic::Campaign => "campaign",
            Topic::General => "general",
        }
    }

    pub fn all() -> Vec<Topic> {
        vec![Topic::Revenue, Topic::Campaign, Topic::General]
    }
}
