//! Reverse-order compensation planning.

use crate::execution::StepResult;
use crate::state::StepStatus;
use crate::steps::compensated_message;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompensationPlanner;

impl CompensationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Returns one compensated result per completed step, last completed first.
    ///
    /// Failed and already-compensated steps need no rollback and are skipped.
    pub fn compensate(&self, steps: &[StepResult]) -> Vec<StepResult> {
        steps
            .iter()
            .rev()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| StepResult {
                step: s.step.clone(),
                status: StepStatus::Compensated,
                message: compensated_message(&s.step),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, status: StepStatus) -> StepResult {
        StepResult {
            step: name.to_string(),
            status,
            message: String::new(),
        }
    }

    #[test]
    fn compensates_completed_steps_in_reverse() {
        let input = vec![
            step("A", StepStatus::Completed),
            step("B", StepStatus::Failed),
            step("C", StepStatus::Completed),
        ];

        let output = CompensationPlanner::new().compensate(&input);

        assert_eq!(
            output,
            vec![
                StepResult {
                    step: "C".to_string(),
                    status: StepStatus::Compensated,
                    message: "Compensated C".to_string(),
                },
                StepResult {
                    step: "A".to_string(),
                    status: StepStatus::Compensated,
                    message: "Compensated A".to_string(),
                },
            ]
        );
    }

    #[test]
    fn nothing_to_compensate() {
        let planner = CompensationPlanner::new();
        assert!(planner.compensate(&[]).is_empty());
        assert!(
            planner
                .compensate(&[
                    step("A", StepStatus::Failed),
                    step("B", StepStatus::Compensated)
                ])
                .is_empty()
        );
    }

    #[test]
    fn same_input_same_plan() {
        let input = vec![step("A", StepStatus::Completed), step("B", StepStatus::Completed)];
        let planner = CompensationPlanner::new();
        assert_eq!(planner.compensate(&input), planner.compensate(&input));
    }
}
