pub mod embedding;
pub mod llm_provider;
pub mod question_index;
