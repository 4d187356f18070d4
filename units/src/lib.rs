//! Physical quantities used at the edges of the mapping engine.
//!
//! Configuration files describe voxel sizes and grid origins with explicit
//! units (`"2.5 mm"`, `"0.1 cm"`); these are parsed into `uom` quantities and
//! converted to plain millimetre `f32`s before reaching the inner loops.

pub mod todo;

pub use uom;
pub use float_eq;

pub use uom::si::Quantity;
pub use uom::si::f32::{Angle, Length, Ratio};

mod units {
  pub use uom::si::{length::{micrometer, millimeter, centimeter},
                    ratio ::ratio,
                    angle ::{degree, radian},
  };
}

// Making values from float literals is very long-winded, so provide some
// pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(um     Length  micrometer);
wrap!(mm     Length  millimeter);
wrap!(cm     Length  centimeter);
wrap!(ratio  Ratio        ratio);
wrap!(degree Angle       degree);
wrap!(radian Angle       radian);

// Reverse direction of the above.
pub fn mm_    (x: Length) -> f32 { x.get::<units::millimeter>() }
pub fn ratio_ (x: Ratio ) -> f32 { x.get::<units::ratio>() }
pub fn degree_(x: Angle ) -> f32 { x.get::<units::degree>() }
pub fn radian_(x: Angle ) -> f32 { x.get::<units::radian>() }

/// Cosine of an angle, as a bare number
pub fn cos_(x: Angle) -> f32 { ratio_(x.cos()) }

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    $crate::float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}


#[cfg(test)]
mod tests {
  use super::*;
  use float_eq::assert_float_eq;

  #[test]
  fn lengths_sum_across_units() {
    let v = vec![mm(1.0), cm(1.0), um(500.0)];
    let total: Length = v.into_iter().sum();
    use units::micrometer;
    assert_uom_eq!(micrometer, total, mm(11.5), rel <= 1e-6);
  }

  #[test]
  fn lengths_parse_with_units() -> Result<(), Box<dyn std::error::Error>> {
    let l: Length = "2.5 mm".parse()?;
    assert_float_eq!(mm_(l), 2.5, abs <= 1e-5);
    let l: Length = "0.25 cm".parse()?;
    assert_float_eq!(mm_(l), 2.5, abs <= 1e-5);
    Ok(())
  }

  #[test]
  fn cosine_of_forty_five_degrees() {
    assert_float_eq!(cos_(degree(45.0)), std::f32::consts::FRAC_1_SQRT_2, abs <= 1e-6);
    assert_float_eq!(degree_(radian(std::f32::consts::PI)), 180.0, abs <= 1e-4);
  }
}
