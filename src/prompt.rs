//! Prompt Builder: renders a problem and a candidate answer into the two grading messages.
//!
//! Pure and deterministic. The same `(problem, answer)` always produces byte-identical
//! prompts, and the answer is appended verbatim as the final section.

use crate::domain::Problem;

pub const GRADING_SYSTEM_PROMPT: &str = r#"You are an expert coding interview grader. You evaluate candidate answers to LeetCode-style problems.

The candidate provides a text/pseudocode solution outline, NOT runnable code. Your job is to assess their understanding of the problem, their approach, and their analysis.

Grade strictly but fairly:
- "Pattern identified" means they named or clearly described the correct algorithmic technique (e.g., "use a hash map to store complements" for Two Sum).
- "Solution works" means their described steps would produce correct output for all valid inputs, including edge cases.
- "Complexity analysis" requires BOTH time and space complexity to be correctly stated.
- "Optimal solution" means they achieve the best known time complexity. A correct but suboptimal approach (e.g., O(n²) brute force when O(n) exists) should fail this criterion.

You MUST call the submit_grading function with your assessment. Do not answer in plain text."#;

/// Marks the start of the candidate's answer in the user prompt.
pub const ANSWER_SEPARATOR: &str = "---\n\n## Candidate's Answer\n\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GradingPrompt {
  pub system: String,
  pub user: String,
}

pub fn build_prompt(problem: &Problem, answer: &str) -> GradingPrompt {
  GradingPrompt {
    system: GRADING_SYSTEM_PROMPT.to_string(),
    user: build_user_prompt(problem, answer),
  }
}

fn build_user_prompt(problem: &Problem, answer: &str) -> String {
  let mut out = format!(
    "## Problem: {} (#{}) [{}]\n\n### Description\n{}\n\n### Examples\n",
    problem.title, problem.source_id, problem.difficulty, problem.description
  );

  for text in problem.examples.iter().filter_map(|e| e.text()) {
    out.push_str(text);
    out.push_str("\n\n");
  }

  if !problem.constraints.is_empty() {
    out.push_str("### Constraints\n");
    for c in &problem.constraints {
      out.push_str("- ");
      out.push_str(c);
      out.push('\n');
    }
    out.push('\n');
  }

  if let Some(sig) = &problem.python3_snippet {
    out.push_str("### Python3 Function Signature\n```python\n");
    out.push_str(sig);
    out.push_str("\n```\n\n");
  }

  out.push_str(ANSWER_SEPARATOR);
  out.push_str(answer);
  out
}
