//! Chart descriptors derived from chart directives
//!
//! The renderer consumes these as `{ id, type, title, xAxisData?, seriesData?, pieData? }`.

use serde::{Deserialize, Serialize};

use crate::topic::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

impl ChartKind {
    pub fn for_topic(topic: Topic) -> Self {
        match topic {
            Topic::Revenue => ChartKind::Line,
            Topic::Campaign => ChartKind::Bar,
            Topic::General => ChartKind::Pie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_data: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pie_data: Option<Vec<PieSlice>>,
}

impl ChartDescriptor {
    /// Build the mock chart that matches a directive title.
    pub fn from_title(id: impl Into<String>, title: &str) -> Self {
        let kind = ChartKind::for_topic(Topic::classify(title));
        let mut chart = Self {
            id: id.into(),
            kind,
            title: title.to_string(),
            x_axis_data: None,
            series_data: None,
            pie_data: None,
        };

        match kind {
            ChartKind::Line => {
                chart.x_axis_data = Some(labels(&["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]));
                chart.series_data = Some(vec![820.0, 932.0, 901.0, 934.0, 1290.0, 1330.0, 1320.0]);
            }
            ChartKind::Bar => {
                chart.x_axis_data = Some(labels(&["CTR", "Conversion", "ROI", "Engagement", "Reach"]));
                chart.series_data = Some(vec![4.2, 2.8, 3.2, 5.1, 6.7]);
            }
            ChartKind::Pie => {
                chart.pie_data = Some(slices(&[
                    ("Category A", 335.0),
                    ("Category B", 310.0),
                    ("Category C", 234.0),
                    ("Category D", 135.0),
                    ("Category E", 1548.0),
                ]));
            }
        }

        chart
    }

    /// Number of data points, whichever series the chart carries
    pub fn len(&self) -> usize {
        self.series_data
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.pie_data.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn slices(entries: &[(&str, f64)]) -> Vec<PieSlice> {
    entries
        .iter()
        .map(|(name, value)| PieSlice {
            name: name.to_string(),
            value: *value,
        })
        .collect()
}
