use crate::model::WorkoutStats;

/// Tracks which workout of the selected date is on screen.
#[derive(Debug, Default)]
pub struct WorkoutNavigator {
    workouts: Vec<WorkoutStats>,
    current_index: usize,
}

impl WorkoutNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list for a newly fetched date. Selection always restarts
    /// at the first workout.
    pub fn replace(&mut self, workouts: Vec<WorkoutStats>) {
        self.workouts = workouts;
        self.current_index = 0;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn select_previous(&mut self) {
        if self.workouts.is_empty() {
            return;
        }
        self.current_index = if self.current_index > 0 {
            self.current_index - 1
        } else {
            self.workouts.len() - 1
        };
    }

    pub fn select_next(&mut self) {
        if self.workouts.is_empty() {
            return;
        }
        self.current_index = if self.current_index < self.workouts.len() - 1 {
            self.current_index + 1
        } else {
            0
        };
    }

    pub fn current(&self) -> Option<&WorkoutStats> {
        self.workouts.get(self.current_index)
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.workouts.is_empty()).then_some(self.current_index)
    }

    pub fn workouts(&self) -> &[WorkoutStats] {
        &self.workouts
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    /// "Workout 2 of 3", or "N / A" when the date has no workouts.
    pub fn position_label(&self) -> String {
        match self.current_index() {
            Some(i) => format!("Workout {} of {}", i + 1, self.workouts.len()),
            None => "N / A".to_string(),
        }
    }
}
