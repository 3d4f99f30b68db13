//! Run memory — the ordered step history a run accumulates.
//!
//! The scheduler appends each completed step exactly once; steps are never
//! mutated after append. `render` produces the conversation view that step
//! logic feeds to the model on the next iteration.

use crate::model::ModelMessage;
use crate::step::ActionStep;

/// Ordered, append-only step history for one run.
pub trait RunMemory: Send {
    /// Append a completed step. Steps arrive in step-number order.
    fn append(&mut self, step: ActionStep);

    /// The full ordered history.
    fn steps(&self) -> &[ActionStep];

    /// Render the history as model messages.
    fn render(&self) -> Vec<ModelMessage>;
}

/// The default in-memory history.
#[derive(Debug, Default)]
pub struct StepHistory {
    steps: Vec<ActionStep>,
}

impl StepHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunMemory for StepHistory {
    fn append(&mut self, step: ActionStep) {
        self.steps.push(step);
    }

    fn steps(&self) -> &[ActionStep] {
        &self.steps
    }

    fn render(&self) -> Vec<ModelMessage> {
        let mut messages = Vec::new();
        for step in &self.steps {
            if let Some(output) = &step.model_output {
                messages.push(ModelMessage::assistant(output));
            }
            for observation in &step.observations {
                messages.push(ModelMessage::tool(observation));
            }
            if let Some(error) = &step.error {
                messages.push(ModelMessage::tool(format!("Error: {error}")));
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::step::ActionStepBuilder;
    use uuid::Uuid;

    #[test]
    fn append_preserves_order() {
        let trace = Uuid::new_v4();
        let mut history = StepHistory::new();
        for n in 0..3 {
            history.append(ActionStepBuilder::new(n, trace).finish());
        }
        let numbers: Vec<usize> = history.steps().iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn render_interleaves_output_and_observations() {
        let trace = Uuid::new_v4();
        let mut history = StepHistory::new();
        history.append(
            ActionStepBuilder::new(0, trace)
                .model_output("check the weather")
                .observation("Sunny, 24C")
                .finish(),
        );

        let messages = history.render();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[1].role, Role::Tool);
        assert_eq!(messages[1].content, "Sunny, 24C");
    }
}
