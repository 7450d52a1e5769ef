use std::process::ExitCode;
use std::time::Duration;

use interaction::FixedStepLoop;
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::scenario::SandboxError;
use super::session::Session;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        frames,
        frame_dt,
        mut session,
    } = app;
    let mut sim = FixedStepLoop::new(config);

    for frame in 0..frames {
        if let Err(err) = run_frame(&mut sim, &mut session, frame_dt) {
            error!(error = %err, frame, "sandbox_tick_failed");
            return ExitCode::FAILURE;
        }
    }

    let stats = session.stats();
    info!(
        frames,
        ticks = sim.tick_count(),
        interactions = stats.interactions,
        hover_changes = stats.hover_changes,
        notices = stats.notices,
        defaulted_rows = stats.defaulted_rows,
        "sandbox_finished"
    );
    ExitCode::SUCCESS
}

fn run_frame(
    sim: &mut FixedStepLoop,
    session: &mut Session,
    frame_dt: Duration,
) -> Result<u32, SandboxError> {
    let mut failure = None;
    let ticks = sim.advance(frame_dt, |tick, dt| {
        if failure.is_some() {
            return;
        }
        if let Err(err) = session.tick(tick, dt) {
            failure = Some(err);
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(ticks),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use interaction::{ConfigTable, LoopConfig};

    use super::*;
    use crate::app::scenario::parse_scenario_json;

    fn empty_session() -> Session {
        let scenario = parse_scenario_json(
            Path::new("inline.json"),
            r#"{ "player": { "location": { "x": 0.0, "y": 0.0, "z": 0.0 } } }"#,
        )
        .expect("scenario");
        Session::build(&scenario, &ConfigTable::default()).expect("session")
    }

    #[test]
    fn frame_runs_planned_ticks() {
        let mut sim = FixedStepLoop::new(LoopConfig::default());
        let mut session = empty_session();

        let ticks = run_frame(&mut sim, &mut session, Duration::from_millis(40)).expect("frame");
        assert_eq!(ticks, 2);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn oversized_frame_is_capped() {
        let mut sim = FixedStepLoop::new(LoopConfig::default());
        let mut session = empty_session();

        let ticks = run_frame(&mut sim, &mut session, Duration::from_secs(2)).expect("frame");
        assert_eq!(ticks, LoopConfig::default().max_ticks_per_frame);
    }
}
