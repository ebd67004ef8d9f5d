pub mod chatbot;
pub mod enhanced_predictor;
pub mod pcos;
pub mod predictor;

pub use chatbot::{ChatOutcome, ChatService};
pub use enhanced_predictor::EnhancedPredictor;
pub use pcos::calculate_pcos_risk;
pub use predictor::{CycleHistory, CyclePredictor};
