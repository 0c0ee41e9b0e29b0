//! Canned assistant replies
//!
//! Every reply opens with the assistant's greeting; the body is chosen by the
//! topic of the latest user message.

use crate::topic::Topic;

pub const GREETING: &str = "I'm Marvin, your AI assistant. ";

const REVENUE_REPLY: &str = concat!(
    "I'm Marvin, your AI assistant. ",
    "Based on our data, revenue decreased by 12% last week compared to the previous week. ",
    "The main factors were:\n\n",
    "1. Seasonal fluctuation (accounts for ~60% of the drop)\n",
    "2. Technical issues with the payment processor on Tuesday (accounts for ~30%)\n",
    "3. Increased competition in the market (accounts for ~10%)\n\n",
    "[CHART:Revenue Trend]\n\n",
    "I've prepared a detailed analysis artifact with multiple visualizations ",
    "to help you understand the revenue decline better.\n\n",
    "[ARTIFACT:revenue-analysis]\n\n",
    "Would you like me to prepare a detailed report on this issue?",
);

const CAMPAIGN_REPLY: &str = concat!(
    "I'm Marvin, your AI assistant. ",
    "The last marketing campaign performed 23% better than previous ones. Key metrics:\n\n",
    "- Click-through rate: 4.2% (up from 3.1%)\n",
    "- Conversion rate: 2.8% (up from 2.1%)\n",
    "- ROI: 320% (up from 240%)\n\n",
    "[CHART:Campaign Performance]\n\n",
    "The improvements came primarily from better targeting and messaging refinement.",
);

const DEFAULT_REPLY: &str = concat!(
    "I'm Marvin, your AI assistant. ",
    "I can help you analyze your business data, create visualizations, and provide insights. ",
    "Ask me about revenue, marketing campaigns, user engagement, ",
    "or any other business metrics you're interested in.",
);

/// Full reply body for a topic, directives included
pub fn reply_for(topic: Topic) -> &'static str {
    match topic {
        Topic::Revenue => REVENUE_REPLY,
        Topic::Campaign => CAMPAIGN_REPLY,
        Topic::General => DEFAULT_REPLY,
    }
}

/// Pick the reply for the latest user message
pub fn select_reply(latest: &str) -> (Topic, &'static str) {
    let topic = Topic::classify(latest);
    (topic, reply_for(topic))
}

/// Split a reply into streaming tokens.
///
/// Splits on single spaces only, so list formatting newlines stay inside
/// their token and consecutive spaces yield empty tokens.
pub fn tokenize(reply: &str) -> impl Iterator<Item = &str> {
    reply.split(' ')
}
