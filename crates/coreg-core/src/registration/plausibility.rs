use crate::config::PlausibilityConfig;
use crate::error::EstimateFailure;
use crate::transform::TransformModel;

/// Reject estimates outside the configured geometric bounds.
pub fn check_plausibility(
    transform: &TransformModel,
    config: &PlausibilityConfig,
) -> Result<(), EstimateFailure> {
    let implausible = |msg: String| Err(EstimateFailure::ImplausibleTransform(msg));

    if !transform.matrix().iter().flatten().all(|v| v.is_finite()) {
        return implausible("non-finite coefficients".to_string());
    }
    if transform.invert().is_err() {
        return Err(EstimateFailure::SingularTransform);
    }
    if !config.allow_reflection && transform.linear_determinant() < 0.0 {
        return implausible("transform contains a reflection".to_string());
    }

    let rotation = transform.rotation().to_degrees().abs();
    if rotation > config.max_rotation_deg {
        return implausible(format!(
            "rotation {rotation:.2}° exceeds {:.2}°",
            config.max_rotation_deg
        ));
    }

    let (s_max, s_min) = transform.singular_values();
    if s_min < config.min_scale || s_max > config.max_scale {
        return implausible(format!(
            "scale [{s_min:.3}, {s_max:.3}] outside [{:.3}, {:.3}]",
            config.min_scale, config.max_scale
        ));
    }

    let (px, py) = transform.perspective();
    if px.abs().max(py.abs()) > config.max_perspective {
        return implausible(format!(
            "perspective terms ({px:.2e}, {py:.2e}) exceed {:.2e}",
            config.max_perspective
        ));
    }

    if let Some(limit) = config.max_translation {
        let (dx, dy) = transform.translation_components();
        let magnitude = dx.hypot(dy);
        if magnitude > limit {
            return implausible(format!(
                "translation {magnitude:.2} px exceeds {limit:.2} px"
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_motions_pass_defaults() {
        let config = PlausibilityConfig::default();
        for t in [
            TransformModel::identity(),
            TransformModel::translation(12.0, -3.0),
            TransformModel::euler(1.0, 2.0, 10f64.to_radians()),
        ] {
            assert!(check_plausibility(&t, &config).is_ok(), "{t} should pass");
        }
    }

    #[test]
    fn large_rotation_reflection_and_scale_are_rejected() {
        let config = PlausibilityConfig::default();
        let rejected = [
            TransformModel::euler(0.0, 0.0, 60f64.to_radians()),
            TransformModel::affine([-1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            TransformModel::affine([3.0, 0.0, 0.0, 0.0, 3.0, 0.0]),
            TransformModel::homography([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.01, 0.0]),
        ];
        for t in rejected {
            assert!(
                matches!(
                    check_plausibility(&t, &config),
                    Err(EstimateFailure::ImplausibleTransform(_))
                ),
                "{t} should be rejected"
            );
        }
    }

    #[test]
    fn translation_bound_is_optional() {
        let t = TransformModel::translation(30.0, 40.0);
        let mut config = PlausibilityConfig::default();
        assert!(check_plausibility(&t, &config).is_ok());
        config.max_translation = Some(49.0);
        assert!(check_plausibility(&t, &config).is_err());
    }

    #[test]
    fn singular_transform_is_flagged() {
        let t = TransformModel::affine([0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            check_plausibility(&t, &PlausibilityConfig::default()),
            Err(EstimateFailure::SingularTransform)
        );
    }
}
