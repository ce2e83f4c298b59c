pub mod assessment;
pub mod error;
pub mod local;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod roster;
pub mod store;
pub mod terminology;

pub use assessment::{AssessmentResult, RubricAssessment, TerminologyItem};
pub use error::{FeynError, FeynResult};
pub use local::LocalProvider;
pub use models::{should_switch_model, ModelConfig, MODEL_LIST};
pub use pipeline::{
    AnswerAssessor, AssessmentPipeline, QuestionGenerator, ReferenceAnswerGenerator,
};
pub use record::{KnowledgeRecord, Tag};
pub use roster::{IndexStore, MemoryIndexStore, ModelRoster, RosterStatus};
pub use store::{RecordStore, TagStore};
