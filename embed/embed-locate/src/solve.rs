//! Per-element inversion and projection.
//!
//! Both solvers work on `x(xi) = sum N_i(xi) x_i` over the reference cell.
//! Inversion is Newton iteration on `x(xi) = p`; projection is bound-constrained
//! Gauss-Newton on `|x(xi) - p|^2`, clamping `xi` to the cell and freezing axes
//! whose gradient pushes out of it.

use embed_types::{Aabb, ElementShape, Point3, Xi, interpolate};
use nalgebra::{Matrix3, Vector3};

/// Largest reference coordinate magnitude before an inversion is abandoned.
const DIVERGENCE_LIMIT: f64 = 10.0;

/// Step length below which iteration stops.
const STEP_EPSILON: f64 = 1e-14;

/// Fraction of the acceptance tolerance Newton iterates down to.
const CONVERGENCE_FACTOR: f64 = 1e-6;

/// Field value and Jacobian `dx/dxi` at `xi`. Columns past the shape
/// dimension are zero.
pub(crate) fn evaluate_with_jacobian(
    shape: ElementShape,
    values: &[Point3<f64>],
    xi: &Xi,
) -> (Point3<f64>, Matrix3<f64>) {
    let point = interpolate(shape, values, xi);
    let derivatives = shape.basis_derivatives(xi);
    let mut jacobian = Matrix3::zeros();
    for (value, row) in values.iter().zip(derivatives.iter()) {
        for axis in 0..shape.dimension() {
            jacobian.column_mut(axis).axpy(row[axis], &value.coords, 1.0);
        }
    }
    (point, jacobian)
}

fn free_axes(shape: ElementShape) -> [bool; 3] {
    let mut free = [false; 3];
    for slot in free.iter_mut().take(shape.dimension()) {
        *slot = true;
    }
    free
}

/// Solve `(JᵀJ) δ = -Jᵀr` restricted to the free axes.
fn gauss_newton_step(
    jacobian: &Matrix3<f64>,
    residual: &Vector3<f64>,
    free: [bool; 3],
) -> Option<Vector3<f64>> {
    let mut j = *jacobian;
    for (axis, &is_free) in free.iter().enumerate() {
        if !is_free {
            j.column_mut(axis).fill(0.0);
        }
    }
    let mut normal = j.transpose() * j;
    for (axis, &is_free) in free.iter().enumerate() {
        if !is_free {
            normal[(axis, axis)] = 1.0;
        }
    }
    let rhs = -(j.transpose() * residual);
    let step = normal.lu().solve(&rhs)?;
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// Find `xi` with `x(xi) == target` inside the reference cell.
///
/// The residual tolerance is `tolerance` times the element's bounding-box
/// diagonal; `xi` may lie outside the cell by `tolerance` and is clamped.
/// Iteration converges well past that tolerance before the result is judged.
pub(crate) fn invert(
    shape: ElementShape,
    values: &[Point3<f64>],
    target: &Point3<f64>,
    tolerance: f64,
    max_iterations: u32,
) -> Option<Xi> {
    let size = Aabb::from_points(values).diagonal();
    let residual_tolerance = if size > 0.0 { tolerance * size } else { tolerance };
    let convergence = (residual_tolerance * CONVERGENCE_FACTOR).max(4.0 * f64::EPSILON * size);
    let free = free_axes(shape);

    let mut xi = shape.centre();
    for _ in 0..max_iterations {
        let (point, jacobian) = evaluate_with_jacobian(shape, values, &xi);
        let residual = point - target;
        if residual.norm() <= convergence {
            break;
        }
        let step = gauss_newton_step(&jacobian, &residual, free)?;
        xi += step;
        if xi.amax() > DIVERGENCE_LIMIT {
            return None;
        }
        if step.norm() < STEP_EPSILON {
            break;
        }
    }

    let residual = interpolate(shape, values, &xi) - target;
    (residual.norm() <= residual_tolerance && shape.contains_xi(&xi, tolerance))
        .then(|| shape.clamp(&xi))
}

/// Find the `xi` in the reference cell nearest to `target`, returning it with
/// the squared distance.
///
/// Starts from the cell centre and from the nearest node, keeping the better.
pub(crate) fn project(
    shape: ElementShape,
    values: &[Point3<f64>],
    target: &Point3<f64>,
    max_iterations: u32,
) -> (Xi, f64) {
    let from_centre = project_from(shape, values, target, shape.centre(), max_iterations);

    let nearest_node = values
        .iter()
        .enumerate()
        .map(|(node, value)| (node, (value - target).norm_squared()))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest_node {
        Some((node, _)) => {
            let from_node =
                project_from(shape, values, target, shape.node_xi(node), max_iterations);
            if from_node.1 < from_centre.1 {
                from_node
            } else {
                from_centre
            }
        }
        None => from_centre,
    }
}

fn project_from(
    shape: ElementShape,
    values: &[Point3<f64>],
    target: &Point3<f64>,
    start: Xi,
    max_iterations: u32,
) -> (Xi, f64) {
    let distance_squared = |xi: &Xi| (interpolate(shape, values, xi) - target).norm_squared();

    let mut xi = start;
    let mut current = distance_squared(&xi);
    for _ in 0..max_iterations {
        let (point, jacobian) = evaluate_with_jacobian(shape, values, &xi);
        let residual = point - target;
        let gradient = jacobian.transpose() * residual;

        let mut free = [false; 3];
        for (axis, slot) in free.iter_mut().enumerate().take(shape.dimension()) {
            let blocked_low = xi[axis] <= 0.0 && gradient[axis] > 0.0;
            let blocked_high = xi[axis] >= 1.0 && gradient[axis] < 0.0;
            *slot = !(blocked_low || blocked_high);
        }
        if !free.contains(&true) {
            break;
        }
        let Some(step) = gauss_newton_step(&jacobian, &residual, free) else {
            break;
        };

        // Backtrack until the clamped step does not increase the distance.
        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..16 {
            let candidate = shape.clamp(&(xi + step * scale));
            let candidate_distance = distance_squared(&candidate);
            if candidate_distance <= current {
                accepted = Some((candidate, candidate_distance));
                break;
            }
            scale *= 0.5;
        }
        let Some((candidate, candidate_distance)) = accepted else {
            break;
        };

        let moved = (candidate - xi).norm();
        xi = candidate;
        current = candidate_distance;
        if moved < STEP_EPSILON {
            break;
        }
    }
    (xi, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A unit cube scaled by 2 in x and sheared in z.
    fn deformed_cube() -> Vec<Point3<f64>> {
        (0..8)
            .map(|node| {
                let xi = ElementShape::Cube.node_xi(node);
                Point3::new(2.0 * xi.x, xi.y, xi.z + 0.25 * xi.x)
            })
            .collect()
    }

    #[test]
    fn test_jacobian_of_affine_cube() {
        let values = deformed_cube();
        let (_, jacobian) = evaluate_with_jacobian(ElementShape::Cube, &values, &Xi::new(0.3, 0.3, 0.3));
        assert_relative_eq!(jacobian[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[(2, 0)], 0.25, epsilon = 1e-12);
        assert_relative_eq!(jacobian[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_interior_point() {
        let values = deformed_cube();
        let target = interpolate(ElementShape::Cube, &values, &Xi::new(0.2, 0.6, 0.9));
        let xi = invert(ElementShape::Cube, &values, &target, 1e-8, 50).unwrap();
        assert_relative_eq!(xi, Xi::new(0.2, 0.6, 0.9), epsilon = 1e-8);
    }

    #[test]
    fn test_invert_converges_past_tolerance() {
        // Top face twisted about the z axis, so the map is genuinely trilinear.
        let values: Vec<_> = (0..8)
            .map(|node| {
                let xi = ElementShape::Cube.node_xi(node);
                let (sin, cos) = (0.4 * xi.z).sin_cos();
                let (x, y) = (xi.x - 0.5, xi.y - 0.5);
                Point3::new(cos * x - sin * y, sin * x + cos * y, xi.z)
            })
            .collect();
        let expected = Xi::new(0.15, 0.8, 0.7);
        let target = interpolate(ElementShape::Cube, &values, &expected);
        let xi = invert(ElementShape::Cube, &values, &target, 1e-6, 50).unwrap();
        assert_relative_eq!(xi, expected, epsilon = 1e-11);
    }

    #[test]
    fn test_invert_rejects_outside_point() {
        let values = deformed_cube();
        let target = Point3::new(-1.0, 0.5, 0.5);
        assert!(invert(ElementShape::Cube, &values, &target, 1e-8, 50).is_none());
    }

    #[test]
    fn test_project_onto_square_face() {
        let values: Vec<_> = (0..4)
            .map(|node| {
                let xi = ElementShape::Square.node_xi(node);
                Point3::new(xi.x, xi.y, 0.0)
            })
            .collect();
        let (xi, distance_squared) =
            project(ElementShape::Square, &values, &Point3::new(0.25, 0.75, 2.0), 50);
        assert_relative_eq!(xi.x, 0.25, epsilon = 1e-10);
        assert_relative_eq!(xi.y, 0.75, epsilon = 1e-10);
        assert_relative_eq!(distance_squared, 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_project_clamps_to_edge() {
        let values = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let (xi, distance_squared) =
            project(ElementShape::Line, &values, &Point3::new(3.0, 1.0, 0.0), 50);
        assert_relative_eq!(xi.x, 1.0);
        assert_relative_eq!(distance_squared, 5.0, epsilon = 1e-12);
    }
}
