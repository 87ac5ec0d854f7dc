// Presentation generation: prompt construction, the LLM call, record normalisation
// and the multipart endpoint. All LLM calls go through llm_client.

pub mod generator;
pub mod handlers;
pub mod prompts;
