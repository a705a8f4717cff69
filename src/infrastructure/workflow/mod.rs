//! Corrective RAG workflow: node adapters and the orchestrator

mod nodes;
mod orchestrator;

pub use nodes::{
    GenerateNode, GradeDocumentsNode, GuardrailsNode, RetrieveNode, StoreQuestionNode,
    TransformQueryNode, ValidateGenerationNode,
};
pub use orchestrator::{CorrectiveRagWorkflow, TurnResult, WorkflowSettings};
