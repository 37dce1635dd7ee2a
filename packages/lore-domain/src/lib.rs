pub mod confidence;
pub mod redaction;
