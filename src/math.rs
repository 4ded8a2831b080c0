// Impl's organized in order:
// -struct declaration
// -impl
// -conversions
// -add, addassign
// -sub, subassign
// -neg
// -mul, mulassign
// -div, divassign

use std::{error::Error, fmt::Display};

/// Tolerance used when comparing derived floating point quantities
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    DegenerateVector,
    DegenerateQuaternion,
}

impl Display for MathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateVector => write!(f, "cannot take the unit of a zero-length or non-finite vector"),
            Self::DegenerateQuaternion => write!(f, "cannot normalize or invert a zero-norm or non-finite quaternion"),
        }
    }
}

impl Error for MathError {}

/// Double precision 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DVec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64
}

impl DVec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> DVec3 {
        DVec3 { x, y, z }
    }

    pub const fn zero() -> DVec3 {
        DVec3 { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn dot(&self, rhs: &Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Self) -> DVec3 {
        DVec3 {
            x: (self.y * rhs.z) - (self.z * rhs.y),
            y: (self.z * rhs.x) - (self.x * rhs.z),
            z: (self.x * rhs.y) - (self.y * rhs.x)
        }
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn length_to(&self, rhs: &Self) -> f64 {
        (*rhs - *self).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Returns the vector scaled to length one, or `DegenerateVector` if it has no direction
    pub fn unit(&self) -> Result<DVec3, MathError> {
        let m = self.norm();
        if m == 0.0 || !m.is_finite() {
            return Err(MathError::DegenerateVector)
        }
        Ok(*self / m)
    }

    pub fn rotate_by(&self, rotation: &Quat) -> Result<DVec3, MathError> {
        rotation.rotate(self)
    }
}

impl std::ops::Add for DVec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl std::ops::AddAssign for DVec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl std::ops::Sub for DVec3 {
    type Output = DVec3;
    fn sub(self, rhs: Self) -> Self {
        DVec3 { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z }
    }
}

impl std::ops::SubAssign for DVec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs
    }
}

impl std::ops::Neg for DVec3 {
    type Output = Self;
    fn neg(self) -> Self {
        DVec3 { x: -self.x, y: -self.y, z: -self.z }
    }
}

impl std::ops::Mul<f64> for DVec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::Output { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs }
    }
}

impl std::ops::MulAssign<f64> for DVec3 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs
    }
}

impl std::ops::Div<f64> for DVec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { x: self.x / rhs, y: self.y / rhs, z: self.z / rhs }
    }
}

impl std::ops::DivAssign<f64> for DVec3 {
    fn div_assign(&mut self, rhs: f64) {
        *self = *self / rhs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisAngle {
    pub axis: DVec3,
    pub angle: f64,
}

impl AxisAngle {
    pub fn new(axis: DVec3, angle: f64) -> Self {
        AxisAngle { axis, angle }
    }

    /// Rotation quaternion for this axis and angle. The axis does not need to be normalized
    pub fn quat(&self) -> Result<Quat, MathError> {
        let axis = self.axis.unit()?;
        let half_angle = self.angle / 2.0;
        Ok(Quat { w: half_angle.cos(), v: axis * half_angle.sin() })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quat {
    pub w: f64, // real part

    // i^2 = j^2 = k^2 = ijk = -1
    // ij = k
    // jk = i
    // ki = j
    // ji = -k
    // kj = -i
    // ik = -j
    pub v: DVec3, // (i, j, k)
}

impl Quat {
    pub const fn new(w: f64, v: DVec3) -> Quat {
        Quat { w, v }
    }

    pub const fn zero() -> Quat {
        Quat { w: 0.0, v: DVec3::zero() }
    }

    pub const fn identity() -> Quat {
        Quat { w: 1.0, v: DVec3::zero() }
    }

    pub fn dot(&self, rhs: &Self) -> f64 {
        self.w * rhs.w + self.v.dot(&rhs.v)
    }

    pub fn conjugate(&self) -> Quat {
        Quat { w: self.w, v: -self.v }
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.v.is_finite()
    }

    pub fn inverse(&self) -> Result<Quat, MathError> {
        let sq_len = self.norm_squared();
        if sq_len == 0.0 || !sq_len.is_finite() {
            return Err(MathError::DegenerateQuaternion)
        }
        Ok(self.conjugate() / sq_len)
    }

    pub fn unit(&self) -> Result<Quat, MathError> {
        let magnitude = self.norm();
        if magnitude == 0.0 || !magnitude.is_finite() {
            return Err(MathError::DegenerateQuaternion)
        }
        Ok(*self / magnitude)
    }

    /// Rotates `vec` by the sandwich product `q * (0, vec) * q^-1`
    pub fn rotate(&self, vec: &DVec3) -> Result<DVec3, MathError> {
        let result = *self * Quat { w: 0.0, v: *vec } * self.inverse()?;
        Ok(result.v)
    }
}

impl std::ops::Add for Quat {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Quat { w: self.w + rhs.w, v: self.v + rhs.v }
    }
}

impl std::ops::Sub for Quat {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Quat { w: self.w - rhs.w, v: self.v - rhs.v }
    }
}

impl std::ops::Neg for Quat {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Quat { w: -self.w, v: -self.v }
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        let w = self.w * rhs.w - self.v.dot(&rhs.v);
        let v = (self.w * rhs.v) + (rhs.w * self.v) + self.v.cross(&rhs.v);
        Quat { w, v }
    }
}

impl std::ops::Mul<f64> for Quat {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Quat { w: self.w * rhs, v: self.v * rhs }
    }
}

impl std::ops::Div<f64> for Quat {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Quat { w: self.w / rhs, v: self.v / rhs }
    }
}

impl std::ops::Div for Quat {
    type Output = Result<Quat, MathError>;
    fn div(self, rhs: Self) -> Self::Output {
        Ok(self * rhs.inverse()?)
    }
}

// Built-in type extensions & conversions

impl std::ops::Mul<DVec3> for f64 {
    type Output = DVec3;
    fn mul(self, rhs: Self::Output) -> Self::Output {
        Self::Output { x: self * rhs.x, y: self * rhs.y, z: self * rhs.z }
    }
}

impl std::ops::Mul<Quat> for f64 {
    type Output = Quat;
    fn mul(self, rhs: Self::Output) -> Self::Output {
        rhs * self
    }
}
