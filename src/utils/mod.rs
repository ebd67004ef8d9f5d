pub mod safety;

pub use safety::{check_emergency, check_unsafe, is_obviously_off_topic, truncate_for_log};
