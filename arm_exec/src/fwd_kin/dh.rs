//! Denavit-Hartenberg transform calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix4;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the standard Denavit-Hartenberg transform for a single joint.
///
/// # Inputs
/// - `theta_rad`: the joint angle, already corrected for the mechanical
///   zero offset
/// - `d_m`: the link offset along the previous Z axis
/// - `a_m`: the link length along the rotated X axis
/// - `alpha_rad`: the link twist about the rotated X axis
///
/// The function is pure: angles are unbounded (periodic) reals and there
/// are no error conditions.
pub fn dh_transform(theta_rad: f64, d_m: f64, a_m: f64, alpha_rad: f64) -> Matrix4<f64> {
    let (sin_theta, cos_theta) = theta_rad.sin_cos();
    let (sin_alpha, cos_alpha) = alpha_rad.sin_cos();

    Matrix4::new(
        cos_theta,
        -sin_theta * cos_alpha,
        sin_theta * sin_alpha,
        a_m * cos_theta,
        sin_theta,
        cos_theta * cos_alpha,
        -cos_theta * sin_alpha,
        a_m * sin_theta,
        0.0,
        sin_alpha,
        cos_alpha,
        d_m,
        0.0,
        0.0,
        0.0,
        1.0,
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_zero_params_is_identity() {
        assert_eq!(dh_transform(0.0, 0.0, 0.0, 0.0), Matrix4::identity());
    }

    #[test]
    fn test_homogeneous_structure() {
        let t = dh_transform(0.7, 0.2, 0.3, -1.1);

        // Bottom row of a homogeneous transform is always [0, 0, 0, 1]
        assert_eq!(t[(3, 0)], 0.0);
        assert_eq!(t[(3, 1)], 0.0);
        assert_eq!(t[(3, 2)], 0.0);
        assert_eq!(t[(3, 3)], 1.0);

        // The rotation block is orthonormal: R * R^T = I
        let r = t.fixed_slice::<nalgebra::U3, nalgebra::U3>(0, 0).into_owned();
        let rrt = r * r.transpose();
        assert!((rrt - nalgebra::Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_pure_rotation_about_z() {
        // With d = a = alpha = 0 the transform is a rotation about Z
        let t = dh_transform(FRAC_PI_2, 0.0, 0.0, 0.0);

        assert!((t[(0, 0)] - 0.0).abs() < 1e-15);
        assert!((t[(0, 1)] - -1.0).abs() < 1e-15);
        assert!((t[(1, 0)] - 1.0).abs() < 1e-15);
        assert!((t[(1, 1)] - 0.0).abs() < 1e-15);

        // No translation
        assert_eq!(t[(0, 3)], 0.0);
        assert_eq!(t[(1, 3)], 0.0);
        assert_eq!(t[(2, 3)], 0.0);
    }

    #[test]
    fn test_link_translation() {
        // Zero angle, pure link geometry: translation is (a, 0, d)
        let t = dh_transform(0.0, 0.25, 0.1, 0.0);

        assert_eq!(t[(0, 3)], 0.1);
        assert_eq!(t[(1, 3)], 0.0);
        assert_eq!(t[(2, 3)], 0.25);
    }
}
