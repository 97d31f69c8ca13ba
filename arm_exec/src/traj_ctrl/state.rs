//! Implementations for the TrajCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use super::{Params, TrajCtrlError};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory control module state
#[derive(Default)]
pub struct TrajCtrl {
    pub(crate) params: Params,

    /// The commanded target position, `None` until seeded from the arm's
    /// initial measured position
    current_m_w: Option<Vector3<f64>>,

    pub(crate) report: StatusReport,
}

/// Input data to trajectory control.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The goal position the commanded target should move toward.
    pub goal_m_w: Vector3<f64>,
}

/// Status report for TrajCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// Distance remaining between the commanded target and the goal
    pub remaining_m: f64,

    /// True once the commanded target exactly matches the goal
    pub reached: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = Vector3<f64>;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the TrajCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Perform cyclic processing of trajectory control.
    ///
    /// Advances the commanded target toward the goal by at most one cycle's
    /// distance budget and outputs the new commanded target.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let current = match self.current_m_w {
            Some(c) => c,
            None => return Err(TrajCtrlError::NotSeeded),
        };

        let max_step_m = self.params.speed_ms * crate::CYCLE_PERIOD_S;

        let next = step_toward(&current, &input_data.goal_m_w, max_step_m);
        self.current_m_w = Some(next);

        let remaining_m = (input_data.goal_m_w - next).norm();
        self.report = StatusReport {
            remaining_m,
            reached: remaining_m == 0.0,
        };

        Ok((next, self.report))
    }
}

impl TrajCtrl {
    /// Seed the commanded target with the arm's initial measured position.
    ///
    /// Must be called once before cyclic processing starts.
    pub fn seed(&mut self, initial_m_w: Vector3<f64>) {
        self.current_m_w = Some(initial_m_w);
    }

    /// Get the current commanded target, if seeded.
    pub fn current(&self) -> Option<Vector3<f64>> {
        self.current_m_w
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Move `current` toward `goal` by at most `max_step_m`.
///
/// Within one step of the goal the target snaps to the goal exactly, which
/// avoids overshoot oscillation from floating-point error and covers the
/// zero-distance case without dividing by the distance.
fn step_toward(current: &Vector3<f64>, goal: &Vector3<f64>, max_step_m: f64) -> Vector3<f64> {
    let direction = goal - current;
    let distance = direction.norm();

    if distance <= max_step_m {
        return *goal;
    }

    current + direction / distance * max_step_m
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Build a seeded TrajCtrl with the given speed, bypassing the
    /// parameter file.
    fn traj_ctrl_with(speed_ms: f64, initial: Vector3<f64>) -> TrajCtrl {
        let mut tc = TrajCtrl {
            params: Params { speed_ms },
            ..TrajCtrl::default()
        };
        tc.seed(initial);
        tc
    }

    #[test]
    fn test_unseeded_errors() {
        let mut tc = TrajCtrl::default();

        assert!(matches!(
            tc.proc(&InputData::default()),
            Err(TrajCtrlError::NotSeeded)
        ));
    }

    #[test]
    fn test_snap_within_one_step() {
        let current = Vector3::new(0.1, 0.2, 0.3);
        let goal = Vector3::new(0.1, 0.2, 0.30001);

        // Step far larger than the separation: a single advance lands
        // exactly on the goal, not beyond it
        assert_eq!(step_toward(&current, &goal, 10.0), goal);

        // Zero distance also returns the goal unchanged
        assert_eq!(step_toward(&goal, &goal, 0.0125), goal);
    }

    #[test]
    fn test_step_magnitude_bounded() {
        let current = Vector3::new(0.0, 0.0, 0.0);
        let goal = Vector3::new(1.0, 0.0, 0.0);

        let next = step_toward(&current, &goal, 0.25);

        assert!(((next - current).norm() - 0.25).abs() < 1e-15);
        assert_eq!(next, Vector3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_convergence_without_overshoot() {
        let goal = Vector3::new(-0.2, 0.5, 0.1);
        let mut current = Vector3::new(0.4, -0.3, 0.7);
        let max_step = 0.05;

        let initial_distance: f64 = (goal - current).norm();
        let bound = (initial_distance / max_step).ceil() as usize;

        let mut steps = 0;
        while current != goal {
            let next = step_toward(&current, &goal, max_step);

            // Monotone approach: distance to goal never grows
            assert!((goal - next).norm() <= (goal - current).norm());

            current = next;
            steps += 1;
            assert!(steps <= bound, "did not converge within {} steps", bound);
        }

        // Exact equality after the final snap
        assert_eq!(current, goal);
    }

    #[test]
    fn test_heading_change_mid_flight() {
        let mut current = Vector3::new(0.0, 0.0, 0.0);
        let first_goal = Vector3::new(1.0, 0.0, 0.0);

        for _ in 0..4 {
            current = step_toward(&current, &first_goal, 0.1);
        }
        assert_eq!(current, Vector3::new(0.4, 0.0, 0.0));

        // The goal moves: the next step heads for the new goal from
        // wherever the target currently is, no blending
        let second_goal = Vector3::new(0.4, 1.0, 0.0);
        let next = step_toward(&current, &second_goal, 0.1);
        assert!((next - Vector3::new(0.4, 0.1, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn test_pure_y_axis_scenario() {
        // Initial TCP position (0.3, 0.0, 0.4), goal update "0.3 0.2 0.4",
        // speed 0.5 m/s at a 0.025 s cycle: 0.0125 m per cycle, 0.2 m to
        // travel, so the goal is reached within 16 cycles
        let mut tc = traj_ctrl_with(0.5, Vector3::new(0.3, 0.0, 0.4));
        let input = InputData {
            goal_m_w: Vector3::new(0.3, 0.2, 0.4),
        };

        let mut prev_y = 0.0;

        for cycle in 1..=16 {
            let (current, report) = tc.proc(&input).unwrap();

            // Pure y-axis motion: x and z never move
            assert_eq!(current[0], 0.3);
            assert_eq!(current[2], 0.4);

            // y increases monotonically
            assert!(current[1] > prev_y || report.reached);
            prev_y = current[1];

            if report.reached {
                assert_eq!(current, input.goal_m_w);
                assert!(cycle <= 16);
                return;
            }
        }

        panic!("goal not reached within 16 cycles");
    }
}
