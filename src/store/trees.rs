pub const QUESTIONS: &str = "questions";
pub const META: &str = "meta";
