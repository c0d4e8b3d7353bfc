// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};

/// Lattice vectors as a row matrix [[ax, ay, az], [bx, by, bz], [cx, cy, cz]]
pub type Lattice = [[f64; 3]; 3];

/// Build the row matrix of a lattice (row k is lattice vector k).
pub fn lattice_matrix(lattice: &Lattice) -> Matrix3<f64> {
  Matrix3::from_row_slice(&[
    lattice[0][0],
    lattice[0][1],
    lattice[0][2],
    lattice[1][0],
    lattice[1][1],
    lattice[1][2],
    lattice[2][0],
    lattice[2][1],
    lattice[2][2],
  ])
}

/// Convert fractional coordinates to Cartesian using lattice matrix
///
/// # Formula
/// ```text
/// Cartesian = Lattice^T × Fractional
/// ```
pub fn frac_to_cart(frac: &Vector3<f64>, lattice: &Matrix3<f64>) -> Vector3<f64> {
  lattice.transpose() * frac
}

/// Convert Cartesian coordinates to fractional using lattice matrix
///
/// Returns `None` if the lattice is singular.
///
/// # Formula
/// ```text
/// Fractional = (Lattice^T)^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: &Vector3<f64>, lattice: &Matrix3<f64>) -> Option<Vector3<f64>> {
  let inv_lat = lattice.transpose().try_inverse()?;
  Some(inv_lat * cart)
}

/// Signed cell volume a · (b × c)
pub fn determinant(lattice: &Lattice) -> f64 {
  lattice_matrix(lattice).determinant()
}

/// Distance between neighbouring lattice planes along each lattice direction.
///
/// For direction k this is V / |a_l × a_m|, the height of the cell measured
/// perpendicular to the face spanned by the other two vectors. A sphere of
/// radius r around any point needs ceil(r / spacing_k) cells along k.
pub fn plane_spacings(lattice: &Lattice) -> [f64; 3] {
  let rows = [
    Vector3::from(lattice[0]),
    Vector3::from(lattice[1]),
    Vector3::from(lattice[2]),
  ];
  let volume = rows[0].dot(&rows[1].cross(&rows[2])).abs();

  let mut spacings = [0.0; 3];
  for (k, spacing) in spacings.iter_mut().enumerate() {
    let face = rows[(k + 1) % 3].cross(&rows[(k + 2) % 3]).norm();
    *spacing = volume / face;
  }
  spacings
}

/// Cartesian translation n1·a + n2·b + n3·c
pub fn translation(lattice: &Matrix3<f64>, image: [i32; 3]) -> Vector3<f64> {
  let n = Vector3::new(image[0] as f64, image[1] as f64, image[2] as f64);
  frac_to_cart(&n, lattice)
}
