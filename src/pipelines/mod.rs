/// Sentiment classification
pub mod sentiment;
