use crate::core::constants::{
    EMERGENCY_KEYWORDS, HEALTH_RELATED_KEYWORDS, OFF_TOPIC_KEYWORDS, UNSAFE_KEYWORDS,
};

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Message describes a situation that needs urgent care.
pub fn check_emergency(message: &str) -> bool {
    contains_any(message, EMERGENCY_KEYWORDS)
}

/// Message asks for dangerous self-treatment.
pub fn check_unsafe(message: &str) -> bool {
    contains_any(message, UNSAFE_KEYWORDS)
}

/// Cheap keyword screen: an off-topic keyword with no health keyword at all.
pub fn is_obviously_off_topic(message: &str) -> bool {
    contains_any(message, OFF_TOPIC_KEYWORDS) && !contains_any(message, HEALTH_RELATED_KEYWORDS)
}

/// Shorten user text for log lines.
pub fn truncate_for_log(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        message.to_string()
    } else {
        let head: String = message.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
