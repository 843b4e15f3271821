use std::fmt::Display;

/// Phase of a run, so a UI can label its progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingesting,
    Writing,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ingesting => write!(f, "ingesting"),
            Self::Writing => write!(f, "writing"),
        }
    }
}

/// Progress message sent from the processing thread to a UI.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub progress: f32,
    pub stage: Stage,
    pub done: usize,
    pub total: usize,
}

impl WorkerStatus {
    pub fn new(stage: Stage, done: usize, total: usize) -> Self {
        let progress = if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        };
        Self {
            progress,
            stage,
            done,
            total,
        }
    }
}
