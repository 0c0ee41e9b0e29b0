//! Analysis artifacts referenced by `[ARTIFACT:<id>]` directives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::{labels, slices, ChartDescriptor, ChartKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub charts: Vec<ChartDescriptor>,
    pub insights: Vec<String>,
}

impl ArtifactReport {
    /// Load the report behind an artifact id.
    ///
    /// Every id currently resolves to the revenue analysis report.
    pub fn load(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: "Revenue Analysis Report".to_string(),
            description: "An in-depth analysis of revenue trends and contributing factors".to_string(),
            timestamp: Utc::now(),
            charts: vec![
                ChartDescriptor {
                    id: "chart-1".to_string(),
                    kind: ChartKind::Line,
                    title: "Weekly Revenue Trend".to_string(),
                    x_axis_data: Some(labels(&["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"])),
                    series_data: Some(vec![820.0, 932.0, 901.0, 834.0, 1290.0, 1330.0, 1320.0]),
                    pie_data: None,
                },
                ChartDescriptor {
                    id: "chart-2".to_string(),
                    kind: ChartKind::Bar,
                    title: "Revenue by Product Category".to_string(),
                    x_axis_data: Some(labels(&["Electronics", "Clothing", "Home", "Beauty", "Sports"])),
                    series_data: Some(vec![5200.0, 3800.0, 2900.0, 1800.0, 2300.0]),
                    pie_data: None,
                },
                ChartDescriptor {
                    id: "chart-3".to_string(),
                    kind: ChartKind::Pie,
                    title: "Revenue Distribution by Channel".to_string(),
                    x_axis_data: None,
                    series_data: None,
                    pie_data: Some(slices(&[
                        ("Online Store", 43.0),
                        ("Marketplace", 32.0),
                        ("Retail", 15.0),
                        ("Wholesale", 10.0),
                    ])),
                },
            ],
            insights: [
                "Revenue increased by 15% compared to the previous week",
                "Electronics category continues to be the top performer",
                "Online store remains the primary revenue channel at 43%",
                "Weekend sales show consistent growth over the past month",
                "Recommendation: Focus marketing efforts on the Clothing category to boost its performance",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
