use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::speech::{Narrator, SpeechError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GuidedAction {
    Breathing,
    Grounding,
    Journaling,
}

/// The menu offered when a conversation signals distress.
pub const ACTION_MENU: [GuidedAction; 3] = [
    GuidedAction::Breathing,
    GuidedAction::Grounding,
    GuidedAction::Journaling,
];

impl GuidedAction {
    pub fn label(&self) -> &'static str {
        match self {
            GuidedAction::Breathing => "Box breathing",
            GuidedAction::Grounding => "5-4-3-2-1 grounding",
            GuidedAction::Journaling => "Quick journaling",
        }
    }
}

impl fmt::Display for GuidedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GuidedAction {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "breathing" | "breathe" => Ok(GuidedAction::Breathing),
            "2" | "grounding" | "ground" => Ok(GuidedAction::Grounding),
            "3" | "journaling" | "journal" => Ok(GuidedAction::Journaling),
            other => anyhow::bail!("unknown guided action '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseStep {
    pub instruction: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub action: GuidedAction,
    pub steps: Vec<ExerciseStep>,
}

fn step(instruction: &str, seconds: u64) -> ExerciseStep {
    ExerciseStep {
        instruction: instruction.to_string(),
        duration: Duration::from_secs(seconds),
    }
}

impl Exercise {
    pub fn for_action(action: GuidedAction) -> Self {
        let steps = match action {
            GuidedAction::Breathing => {
                let mut steps = Vec::new();
                for _ in 0..3 {
                    steps.push(step("Breathe in slowly through your nose", 4));
                    steps.push(step("Hold your breath", 4));
                    steps.push(step("Breathe out through your mouth", 4));
                    steps.push(step("Hold, lungs empty", 4));
                }
                steps
            }
            GuidedAction::Grounding => vec![
                step("Name five things you can see around you", 20),
                step("Notice four things you can touch", 20),
                step("Listen for three things you can hear", 15),
                step("Find two things you can smell", 15),
                step("Name one thing you can taste", 10),
            ],
            GuidedAction::Journaling => vec![
                step("Write down what is on your mind right now", 60),
                step("Write one thing that went well today", 45),
                step("Write one small thing you can do for yourself tomorrow", 45),
            ],
        };
        Self { action, steps }
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }
}

/// Walks an exercise step by step, auto-advancing as each step's time runs out.
#[derive(Debug, Clone)]
pub struct ExerciseRunner {
    exercise: Exercise,
    index: usize,
    elapsed_in_step: Duration,
}

impl ExerciseRunner {
    pub fn new(exercise: Exercise) -> Self {
        Self {
            exercise,
            index: 0,
            elapsed_in_step: Duration::ZERO,
        }
    }

    pub fn action(&self) -> GuidedAction {
        self.exercise.action
    }

    pub fn current_step(&self) -> Option<&ExerciseStep> {
        self.exercise.steps.get(self.index)
    }

    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn step_count(&self) -> usize {
        self.exercise.steps.len()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.exercise.steps.len()
    }

    /// Skips to the next step. Returns the new step, if any.
    pub fn advance(&mut self) -> Option<&ExerciseStep> {
        if !self.is_finished() {
            self.index += 1;
            self.elapsed_in_step = Duration::ZERO;
        }
        self.current_step()
    }

    /// Feeds elapsed time and returns how many steps were completed.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        let mut remaining = elapsed;
        let mut completed = 0;

        while let Some(step) = self.exercise.steps.get(self.index) {
            let left_in_step = step.duration.saturating_sub(self.elapsed_in_step);
            if remaining < left_in_step {
                self.elapsed_in_step += remaining;
                break;
            }
            remaining -= left_in_step;
            self.index += 1;
            self.elapsed_in_step = Duration::ZERO;
            completed += 1;
        }

        completed
    }

    /// Narrates every remaining step, holding each step for its duration at
    /// the narrator's pace divided by `speedup`.
    pub async fn run<N: Narrator>(
        &mut self,
        narrator: &mut N,
        speedup: u32,
    ) -> Result<(), SpeechError> {
        let speedup = speedup.max(1);
        tracing::info!(action = ?self.exercise.action, steps = self.step_count(), "starting exercise");

        while let Some(step) = self.current_step() {
            let remaining = step.duration.saturating_sub(self.elapsed_in_step);
            let instruction = format!(
                "[{}/{}] {} ({}s)",
                self.step_index() + 1,
                self.step_count(),
                step.instruction,
                step.duration.as_secs()
            );
            narrator.speak(&instruction)?;
            tokio::time::sleep(narrator.pace(remaining) / speedup).await;
            self.tick(remaining);
        }

        narrator.speak("Well done. Take a moment before moving on.")?;
        tracing::info!(action = ?self.exercise.action, "exercise complete");
        Ok(())
    }
}
