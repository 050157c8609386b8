use nalgebra::{Point3, Vector3};

/// Angstrom to nanometer.
pub const ANGSTROM_TO_NM: f64 = 0.1;

/// Weighted average of positions. Returns `None` when the weights sum to zero
/// or the input is empty.
pub fn weighted_center(points: &[(Point3<f64>, f64)]) -> Option<Point3<f64>> {
    let total: f64 = points.iter().map(|(_, w)| w).sum();
    if points.is_empty() || total.abs() < f64::EPSILON {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, (p, w)| acc + p.coords * *w);
    Some(Point3::from(sum / total))
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Angle a-b-c in degrees, `None` when two points coincide.
pub fn angle_degrees(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<f64> {
    let ba = a - b;
    let bc = c - b;
    let norms = ba.norm() * bc.norm();
    if norms < f64::EPSILON {
        return None;
    }
    let cos = (ba.dot(&bc) / norms).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Dihedral a-b-c-d in degrees within (-180, 180], IUPAC sign convention.
/// `None` when three consecutive points are collinear.
pub fn dihedral_degrees(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> Option<f64> {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm() < f64::EPSILON || n2.norm() < f64::EPSILON {
        return None;
    }
    let m1 = b2.normalize().cross(&n1);
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    Some(y.atan2(x).to_degrees())
}
