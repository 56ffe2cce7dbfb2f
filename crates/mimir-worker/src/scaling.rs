//! Pure scaling decision (§4.F "Scaling decision"). Kept side-effect free
//! so the control loop driving it can be tested without spinning up real
//! worker processes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_threshold: usize,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 10,
            queue_threshold: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAction {
    SpawnOne,
    RetireOne,
    DoNothing,
}

/// §4.F's decision table, transcribed branch for branch.
pub fn decide(active_workers: usize, queue_length: usize, config: &ScalingConfig) -> ScalingAction {
    if active_workers < config.min_workers && queue_length > 0 {
        ScalingAction::SpawnOne
    } else if active_workers >= config.max_workers {
        ScalingAction::DoNothing
    } else if queue_length > config.queue_threshold {
        ScalingAction::SpawnOne
    } else if queue_length == 0 && active_workers > config.min_workers {
        ScalingAction::RetireOne
    } else {
        ScalingAction::DoNothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScalingConfig {
        ScalingConfig {
            min_workers: 2,
            max_workers: 5,
            queue_threshold: 10,
        }
    }

    #[test]
    fn spawns_to_reach_minimum_when_backlog_exists() {
        assert_eq!(decide(0, 3, &config()), ScalingAction::SpawnOne);
    }

    #[test]
    fn does_not_spawn_below_minimum_with_empty_queue() {
        assert_eq!(decide(0, 0, &config()), ScalingAction::DoNothing);
    }

    #[test]
    fn refuses_to_exceed_maximum() {
        assert_eq!(decide(5, 50, &config()), ScalingAction::DoNothing);
    }

    #[test]
    fn spawns_when_backlog_exceeds_threshold() {
        assert_eq!(decide(3, 11, &config()), ScalingAction::SpawnOne);
    }

    #[test]
    fn retires_longest_idle_when_queue_drains_above_minimum() {
        assert_eq!(decide(3, 0, &config()), ScalingAction::RetireOne);
    }

    #[test]
    fn holds_steady_at_minimum_with_empty_queue() {
        assert_eq!(decide(2, 0, &config()), ScalingAction::DoNothing);
    }

    #[test]
    fn holds_steady_mid_range_below_threshold() {
        assert_eq!(decide(3, 5, &config()), ScalingAction::DoNothing);
    }
}
