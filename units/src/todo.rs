/// Quantities which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// The mapping inner loops work on plain `nalgebra` points in mm, so lengths
/// and weights which flow through them are kept as `f32`, with these aliases
/// left in the source as clues about what they represent.

pub type Lengthf32    = f32;
pub type Weightf32    = f32;
pub type Ratiof32     = f32;
pub type Anglef32     = f32; // degrees
pub type Intensityf32 = f32;
