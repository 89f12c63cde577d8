// Moderation: the local filter plus an optional remote classifier, with
// graceful fallback.
//
// The Classifier trait defines the remote interface. The OpenAI-style
// implementation can be swapped for any other provider without touching
// the orchestrator or the send pipeline.

pub mod openai;
pub mod orchestrator;
pub mod report;
pub mod throttle;
pub mod traits;

pub use orchestrator::{ModerationConfig, Moderator};
pub use report::{build_report, ModerationReport, Severity};
pub use traits::{Classifier, ClassifierError, ClassifierResponse};
