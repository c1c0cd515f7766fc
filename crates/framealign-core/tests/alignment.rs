use approx::assert_relative_eq;
use rand::Rng;

use framealign_core::quat::{quat_mul, quat_to_mat33};
use framealign_core::{estimate_alignment, AlignError, AlignWarning, Pose, PosePair};

const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Uniformly distributed random unit quaternion.
fn random_unit_quat(rng: &mut impl Rng) -> [f64; 4] {
    let r1: f64 = rng.random();
    let r2: f64 = rng.random();
    let r3: f64 = rng.random();
    let two_pi = 2.0 * std::f64::consts::PI;
    [
        (1.0 - r1).sqrt() * (two_pi * r2).cos(),
        r1.sqrt() * (two_pi * r3).sin(),
        r1.sqrt() * (two_pi * r3).cos(),
        (1.0 - r1).sqrt() * (two_pi * r2).sin(),
    ]
}

/// Build pose pairs by applying (scale, q_rot, t) exactly to the A-side.
fn exact_pairs(
    positions_a: &[[f64; 3]],
    quats_a: &[[f64; 4]],
    scale: f64,
    q_rot: &[f64; 4],
    t: &[f64; 3],
) -> Vec<PosePair> {
    let r = quat_to_mat33(q_rot);
    positions_a
        .iter()
        .zip(quats_a.iter())
        .map(|(p, q)| {
            let rp = [
                r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2],
                r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2],
                r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2],
            ];
            PosePair {
                pose_a: Pose {
                    position: *p,
                    orientation: *q,
                },
                pose_b: Pose {
                    position: [
                        scale * rp[0] + t[0],
                        scale * rp[1] + t[1],
                        scale * rp[2] + t[2],
                    ],
                    orientation: quat_mul(q_rot, q),
                },
            }
        })
        .collect()
}

fn mat4_mul(a: &[[f64; 4]; 4], b: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut c = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for (k, bk) in b.iter().enumerate() {
                c[i][j] += a[i][k] * bk[j];
            }
        }
    }
    c
}

#[test]
fn scaled_rotated_translated_scenario() {
    // frame B is frame A scaled by 2, rotated 90 degrees about z,
    // translated by (1, 0, 0)
    let q_z90 = [0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2];
    let positions_a = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let quats_a = [[0.0, 0.0, 0.0, 1.0]; 3];
    let pairs = exact_pairs(&positions_a, &quats_a, 2.0, &q_z90, &[1.0, 0.0, 0.0]);

    let alignment = estimate_alignment(&pairs).unwrap();

    assert_relative_eq!(alignment.scale, 2.0, epsilon = 1e-6);
    assert_relative_eq!(alignment.translation[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(alignment.translation[1], 0.0, epsilon = 1e-6);
    assert_relative_eq!(alignment.translation[2], 0.0, epsilon = 1e-6);

    let expected_r = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(alignment.rotation[i][j], expected_r[i][j], epsilon = 1e-6);
        }
    }
    assert!(alignment.warnings.is_empty());
}

#[test]
fn identity_recovery_random_transforms() {
    let mut rng = rand::rng();
    let positions_a = [
        [0.0, 0.0, 0.0],
        [1.0, 0.2, -0.3],
        [-0.4, 1.1, 0.6],
        [0.7, -0.8, 1.5],
    ];
    for _ in 0..20 {
        let q_rot = random_unit_quat(&mut rng);
        let scale = 0.1 + 5.0 * rng.random::<f64>();
        let t = [
            rng.random::<f64>() - 0.5,
            rng.random::<f64>() - 0.5,
            rng.random::<f64>() - 0.5,
        ];
        let quats_a: Vec<[f64; 4]> = (0..4).map(|_| random_unit_quat(&mut rng)).collect();
        let pairs = exact_pairs(&positions_a, &quats_a, scale, &q_rot, &t);

        let alignment = estimate_alignment(&pairs).unwrap();
        let expected_r = quat_to_mat33(&q_rot);

        assert_relative_eq!(alignment.scale, scale, epsilon = 1e-6);
        for i in 0..3 {
            assert_relative_eq!(alignment.translation[i], t[i], epsilon = 1e-6);
            for j in 0..3 {
                assert_relative_eq!(alignment.rotation[i][j], expected_r[i][j], epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn two_pairs_succeed_with_warning() {
    // non-collinear is not required for N=2, only non-coincident
    let positions_a = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
    let quats_a = [[0.0, 0.0, 0.0, 1.0]; 2];
    let pairs = exact_pairs(
        &positions_a,
        &quats_a,
        1.5,
        &[0.0, 0.0, 0.0, 1.0],
        &[0.0, 0.0, 2.0],
    );

    let alignment = estimate_alignment(&pairs).unwrap();
    assert_relative_eq!(alignment.scale, 1.5, epsilon = 1e-6);
    assert!(alignment
        .warnings
        .contains(&AlignWarning::LowSampleCount { actual: 2 }));
}

#[test]
fn empty_and_single_batches_rejected() {
    let err = estimate_alignment(&[]).unwrap_err();
    assert!(matches!(err, AlignError::InsufficientSamples { actual: 0 }));

    let pose = Pose {
        position: [0.0, 0.0, 0.0],
        orientation: [0.0, 0.0, 0.0, 1.0],
    };
    let err = estimate_alignment(&[PosePair {
        pose_a: pose,
        pose_b: pose,
    }])
    .unwrap_err();
    assert!(matches!(err, AlignError::InsufficientSamples { actual: 1 }));
}

#[test]
fn coincident_positions_degenerate_scale() {
    let positions_a = [[1.0, 2.0, 3.0]; 3];
    let quats_a = [[0.0, 0.0, 0.0, 1.0]; 3];
    let pairs = exact_pairs(
        &positions_a,
        &quats_a,
        1.0,
        &[0.0, 0.0, 0.0, 1.0],
        &[0.5, 0.0, 0.0],
    );
    let err = estimate_alignment(&pairs).unwrap_err();
    assert!(matches!(err, AlignError::DegenerateScale { .. }));
}

#[test]
fn double_cover_sign_flips_do_not_change_result() {
    let q_rot = [0.5, -0.5, 0.5, 0.5];
    let positions_a = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.5]];
    let quats_a = [
        [0.0, 0.0, 0.0, 1.0],
        [0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2],
        [0.5, 0.5, 0.5, 0.5],
    ];
    let pairs = exact_pairs(&positions_a, &quats_a, 1.0, &q_rot, &[0.0, 0.0, 0.0]);

    // negate a subset of the B orientations; under the double cover the
    // encoded rotations are identical, a naive component mean would cancel
    let mut flipped = pairs.clone();
    for pair in flipped.iter_mut().take(2) {
        for c in pair.pose_b.orientation.iter_mut() {
            *c = -*c;
        }
    }

    let base = estimate_alignment(&pairs).unwrap();
    let alt = estimate_alignment(&flipped).unwrap();
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(base.rotation[i][j], alt.rotation[i][j], epsilon = 1e-9);
        }
    }
}

#[test]
fn forward_and_inverse_compose_to_identity() {
    let q_rot = [0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2];
    let positions_a = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let quats_a = [[0.0, 0.0, 0.0, 1.0]; 3];
    let pairs = exact_pairs(&positions_a, &quats_a, 0.75, &q_rot, &[0.2, -1.0, 3.0]);

    let alignment = estimate_alignment(&pairs).unwrap();
    assert!(alignment.has_valid_inverse());

    let product = mat4_mul(&alignment.a_to_b, &alignment.b_to_a);
    for i in 0..4 {
        for j in 0..4 {
            assert_relative_eq!(product[i][j], if i == j { 1.0 } else { 0.0 }, epsilon = 1e-9);
        }
    }
}

#[test]
fn zero_scale_marks_inverse_undefined() {
    // all B positions coincide: the regression numerator vanishes and the
    // fitted scale is exactly zero
    let pairs: Vec<PosePair> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .map(|p| PosePair {
            pose_a: Pose {
                position: *p,
                orientation: [0.0, 0.0, 0.0, 1.0],
            },
            pose_b: Pose {
                position: [5.0, 5.0, 5.0],
                orientation: [0.0, 0.0, 0.0, 1.0],
            },
        })
        .collect();

    let alignment = estimate_alignment(&pairs).unwrap();
    assert_relative_eq!(alignment.scale, 0.0);
    assert!(alignment.warnings.contains(&AlignWarning::InverseUndefined));
    assert!(!alignment.has_valid_inverse());
    assert!(alignment
        .b_to_a
        .iter()
        .all(|row| row.iter().all(|x| x.is_nan())));
    // the forward transform is still returned
    assert_relative_eq!(alignment.a_to_b[3][3], 1.0);
}
