use std::collections::VecDeque;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

impl LoopConfig {
    pub fn fixed_dt(&self) -> Duration {
        let fallback = Duration::from_secs_f64(1.0 / 60.0);
        if self.target_tps == 0 {
            return fallback;
        }
        normalize_non_zero_duration(
            Duration::from_secs_f64(1.0 / f64::from(self.target_tps)),
            fallback,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

pub fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::replace(&mut accumulator, Duration::ZERO)
    } else {
        Duration::ZERO
    };

    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

pub fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

pub fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[derive(Debug)]
pub struct FixedStepLoop {
    config: LoopConfig,
    fixed_dt: Duration,
    accumulator: Duration,
    tick_count: u64,
}

impl FixedStepLoop {
    pub fn new(config: LoopConfig) -> Self {
        let fixed_dt = config.fixed_dt();
        Self {
            config,
            fixed_dt,
            accumulator: Duration::ZERO,
            tick_count: 0,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance(&mut self, frame_dt: Duration, mut tick: impl FnMut(u64, f32)) -> u32 {
        let frame_dt = clamp_frame_delta(frame_dt, self.config.max_frame_delta);
        let plan = plan_sim_steps(
            self.accumulator.saturating_add(frame_dt),
            self.fixed_dt,
            self.config.max_ticks_per_frame,
        );
        self.accumulator = plan.remaining_accumulator;

        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_secs_f64() * 1000.0,
                ticks = plan.ticks_to_run,
                "sim_backlog_dropped"
            );
        }

        let dt_seconds = self.fixed_dt.as_secs_f32();
        for _ in 0..plan.ticks_to_run {
            tick(self.tick_count, dt_seconds);
            self.tick_count = self.tick_count.saturating_add(1);
        }
        plan.ticks_to_run
    }
}

/// One-shot tasks deferred to the next tick. Tasks pushed while a drained
/// batch is being processed land in the following batch.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    tasks: VecDeque<T>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn push(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    pub fn drain(&mut self) -> Vec<T> {
        self.tasks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_tps_falls_back_to_sixty_hz() {
        let config = LoopConfig {
            target_tps: 0,
            ..LoopConfig::default()
        };
        assert_eq!(config.fixed_dt(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn fixed_step_loop_carries_remainder_between_frames() {
        let mut sim = FixedStepLoop::new(LoopConfig {
            target_tps: 10,
            ..LoopConfig::default()
        });
        let mut seen = Vec::new();

        let first = sim.advance(Duration::from_millis(150), |index, _| seen.push(index));
        let second = sim.advance(Duration::from_millis(50), |index, _| seen.push(index));

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn deferred_tasks_pushed_during_drain_wait_for_next_batch() {
        let mut queue = DeferredQueue::default();
        queue.push(1);
        queue.push(2);

        let batch = queue.drain();
        for task in &batch {
            queue.push(task * 10);
        }

        assert_eq!(batch, vec![1, 2]);
        assert_eq!(queue.drain(), vec![10, 20]);
        assert!(queue.is_empty());
    }
}
