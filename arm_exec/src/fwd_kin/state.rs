//! Implementations for the FwdKin state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

// Internal
use super::{base_to_world, dh_transform, FwdKinError, Params, JOINT_ZERO_OFFSET_RAD, NUM_JOINTS};
use util::{expr, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Forward kinematics module state
#[derive(Default)]
pub struct FwdKin {
    pub(crate) params: Params,

    /// Evaluated DH parameter arrays, one entry per joint
    pub(crate) dh_d: [f64; NUM_JOINTS],
    pub(crate) dh_a: [f64; NUM_JOINTS],
    pub(crate) dh_alpha: [f64; NUM_JOINTS],

    /// The most recently computed end-effector pose, `None` until the first
    /// `forward` call
    pose: Option<Matrix4<f64>>,

    pub(crate) report: StatusReport,
}

/// Input data to forward kinematics.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The sampled joint angles.
    pub joint_pos_rad: [f64; NUM_JOINTS],

    /// The end-effector world position reported by the simulator, sampled
    /// in the same snapshot as the joint angles.
    pub tcp_pos_m_w: Vector3<f64>,
}

/// Status report for FwdKin processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// End-effector world position computed from the joint angles
    pub fk_pos_m_w: [f64; 3],

    /// Euclidean distance between the computed and the sampled end-effector
    /// positions. A validation signal only, never a control input.
    pub discrepancy_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for FwdKin {
    type InitData = &'static str;
    type InitError = Infallible;

    type InputData = InputData;
    type OutputData = Matrix4<f64>;
    type StatusReport = StatusReport;
    type ProcError = FwdKinError;

    /// Initialise the FwdKin module.
    ///
    /// Expected init data is the path to the parameter file. Missing or
    /// malformed configuration is never fatal: the affected parameter lists
    /// degrade to all-zero entries, which silently degrades validation
    /// accuracy but keeps the exec running.
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    "Could not load FwdKin params from \"{}\", using zero defaults: {}",
                    init_data, e
                );
                Params::default()
            }
        };

        self.dh_d = eval_dh_list(&self.params.dh_d, "dh_d");
        self.dh_a = eval_dh_list(&self.params.dh_a, "dh_a");
        self.dh_alpha = eval_dh_list(&self.params.dh_alpha, "dh_alpha");

        Ok(())
    }

    /// Perform cyclic processing of forward kinematics.
    ///
    /// Computes the end-effector pose from the input joint angles and
    /// reports the discrepancy against the sampled end-effector position.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let pose = self.forward(&input_data.joint_pos_rad)?;
        let fk_pos_m_w = self.position()?;

        self.report = StatusReport {
            fk_pos_m_w: [fk_pos_m_w[0], fk_pos_m_w[1], fk_pos_m_w[2]],
            discrepancy_m: (fk_pos_m_w - input_data.tcp_pos_m_w).norm(),
        };

        Ok((pose, self.report))
    }
}

impl FwdKin {
    /// Compute the world-frame end-effector pose for the given joint angles.
    ///
    /// The joint angle slice must contain exactly [`NUM_JOINTS`] entries.
    /// The mechanical zero offsets are applied here, callers pass the raw
    /// sampled angles.
    pub fn forward(&mut self, joint_pos_rad: &[f64]) -> Result<Matrix4<f64>, FwdKinError> {
        if joint_pos_rad.len() != NUM_JOINTS {
            return Err(FwdKinError::WrongJointCount(joint_pos_rad.len()));
        }

        // Chain the per-joint transforms in joint order
        let mut t_final = Matrix4::identity();

        for i in 0..NUM_JOINTS {
            let theta_rad = joint_pos_rad[i] + JOINT_ZERO_OFFSET_RAD[i];

            t_final *= dh_transform(theta_rad, self.dh_d[i], self.dh_a[i], self.dh_alpha[i]);
        }

        // Correct for the axis convention mismatch between the arm's base
        // frame and the simulator's world frame
        let pose = base_to_world() * t_final;

        self.pose = Some(pose);

        Ok(pose)
    }

    /// Get the translation column of the most recently computed pose.
    pub fn position(&self) -> Result<Vector3<f64>, FwdKinError> {
        match self.pose {
            Some(p) => Ok(Vector3::new(p[(0, 3)], p[(1, 3)], p[(2, 3)])),
            None => Err(FwdKinError::NoPoseComputed),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate one comma-separated DH parameter list, degrading to zeros on
/// any parse failure.
fn eval_dh_list(list: &str, name: &str) -> [f64; NUM_JOINTS] {
    match expr::eval_list(list, NUM_JOINTS) {
        Ok(values) => {
            let mut array = [0.0; NUM_JOINTS];
            array.copy_from_slice(&values);
            array
        }
        Err(e) => {
            warn!(
                "Could not evaluate DH parameter list {} (\"{}\"), using zeros: {}",
                name, list, e
            );
            [0.0; NUM_JOINTS]
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// Build a FwdKin with the given evaluated DH arrays, bypassing the
    /// parameter file.
    fn fwd_kin_with(
        dh_d: [f64; NUM_JOINTS],
        dh_a: [f64; NUM_JOINTS],
        dh_alpha: [f64; NUM_JOINTS],
    ) -> FwdKin {
        FwdKin {
            dh_d,
            dh_a,
            dh_alpha,
            ..FwdKin::default()
        }
    }

    #[test]
    fn test_wrong_joint_count() {
        let mut fk = FwdKin::default();

        assert!(matches!(
            fk.forward(&[0.0; 5]),
            Err(FwdKinError::WrongJointCount(5))
        ));
        assert!(matches!(
            fk.forward(&[0.0; 7]),
            Err(FwdKinError::WrongJointCount(7))
        ));
    }

    #[test]
    fn test_position_before_forward() {
        let fk = FwdKin::default();

        assert!(matches!(fk.position(), Err(FwdKinError::NoPoseComputed)));
    }

    #[test]
    fn test_determinism() {
        let mut fk = fwd_kin_with(
            [0.1519, 0.0, 0.0, 0.11235, 0.08535, 0.0819],
            [0.0, -0.24365, -0.21325, 0.0, 0.0, 0.0],
            [FRAC_PI_2, 0.0, 0.0, FRAC_PI_2, -FRAC_PI_2, 0.0],
        );

        let angles = [0.3, -0.7, 1.1, 0.2, -0.4, 0.9];

        let first = fk.forward(&angles).unwrap();
        let second = fk.forward(&angles).unwrap();

        // Pure function: bitwise identical results on repeated calls
        assert_eq!(first, second);
    }

    #[test]
    fn test_bottom_row_invariant() {
        let mut fk = fwd_kin_with(
            [0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            [0.6, 0.5, 0.4, 0.3, 0.2, 0.1],
            [0.1, -0.2, 0.3, -0.4, 0.5, -0.6],
        );

        let pose = fk.forward(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();

        assert_eq!(pose[(3, 0)], 0.0);
        assert_eq!(pose[(3, 1)], 0.0);
        assert_eq!(pose[(3, 2)], 0.0);
        assert_eq!(pose[(3, 3)], 1.0);
    }

    #[test]
    fn test_base_to_world_is_rotation_only() {
        let b = base_to_world() * Matrix4::identity();

        assert_eq!(b, base_to_world());

        // No translation component
        assert_eq!(b[(0, 3)], 0.0);
        assert_eq!(b[(1, 3)], 0.0);
        assert_eq!(b[(2, 3)], 0.0);

        // Expected fixed rotation: base Y -> world X, base X -> world -Y
        assert_eq!(b[(0, 1)], 1.0);
        assert_eq!(b[(1, 0)], -1.0);
        assert_eq!(b[(2, 2)], 1.0);
    }

    #[test]
    fn test_zero_geometry_has_zero_translation() {
        // With all DH parameters zero each joint transform is a pure
        // rotation about Z, so the end effector stays at the origin
        let mut fk = fwd_kin_with([0.0; 6], [0.0; 6], [0.0; 6]);

        fk.forward(&[0.4, 1.2, -0.3, 0.8, -1.5, 0.2]).unwrap();
        let pos = fk.position().unwrap();

        assert!(pos.norm() < 1e-15);
    }

    #[test]
    fn test_single_link_offset() {
        // Only joint 1 has geometry: a link offset straight up the Z axis.
        // Rotations about Z never move a point on the Z axis, so the
        // end-effector sits at (0, 0, d1) in the base frame, and the
        // base-to-world correction leaves the Z axis untouched.
        let mut fk = fwd_kin_with([0.2, 0.0, 0.0, 0.0, 0.0, 0.0], [0.0; 6], [0.0; 6]);

        fk.forward(&[0.0; 6]).unwrap();
        let pos = fk.position().unwrap();

        assert!((pos - Vector3::new(0.0, 0.0, 0.2)).norm() < 1e-15);
    }
}
