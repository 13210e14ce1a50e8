//! Native adapters for the `safar-core` ports.

pub mod clock;
pub mod embeddings;
pub mod llm;
pub mod policy_source;

pub use clock::SystemClock;
pub use embeddings::OpenAiCompatEmbeddings;
pub use llm::OpenAiCompatProvider;
pub use policy_source::read_policy_document;
