//! Judgment capability: prompts and the judge trait

mod judge;
mod prompt;

pub use judge::{judge_verdict, Judge};
pub use prompt::{render, Prompt, ResponseSchema, Verdict};

#[cfg(test)]
pub use judge::mock::MockJudge;
