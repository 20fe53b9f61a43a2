pub mod gemini;
pub mod tryon;
