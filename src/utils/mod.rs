pub mod pattern;
pub mod time;
