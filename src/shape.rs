//! Symbolic shape functions.
//!
//! A [`Shape`] is a polynomial in the physical coordinates `(x, y, z)`. Shape functions are
//! built per element from interpolation coefficients and stay symbolic until evaluated at a
//! point, which makes exact differentiation possible.
//!
//! The coefficients are stored relative to a [`Frame`], an element-local coordinate system
//! `ξ = (x - origin) / scale`, and are never expanded in absolute coordinates.
use std::fmt;
use std::fmt::{Display, Formatter};

/// A monomial `x^i y^j z^k` identified by its exponents.
pub type Exponents = [u8; 3];

/// Local coordinates `ξ = (x - origin) / scale`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub origin: [f64; 3],
    pub scale: f64,
}

impl Frame {
    /// The physical coordinates themselves.
    pub const IDENTITY: Frame = Frame {
        origin: [0.0; 3],
        scale: 1.0,
    };

    pub fn new(origin: [f64; 3], scale: f64) -> Self {
        Self { origin, scale }
    }

    /// Local coordinates of a physical point.
    pub fn local(&self, point: &[f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|axis| (point[axis] - self.origin[axis]) / self.scale)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    terms: Vec<(f64, Exponents)>,
    frame: Frame,
}

impl Shape {
    /// The zero polynomial.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self::from_terms(vec![(value, [0, 0, 0])])
    }

    /// Builds `Σ c_k · basis_k` in physical coordinates, dropping zero coefficients and
    /// merging equal monomials.
    pub fn from_terms(terms: impl IntoIterator<Item = (f64, Exponents)>) -> Self {
        Self::from_local_terms(terms, Frame::IDENTITY)
    }

    /// Builds `Σ c_k · basis_k(ξ)` in the local coordinates of `frame`.
    pub fn from_local_terms(terms: impl IntoIterator<Item = (f64, Exponents)>, frame: Frame) -> Self {
        let mut merged: Vec<(f64, Exponents)> = Vec::new();
        for (coefficient, exponents) in terms {
            match merged.iter_mut().find(|(_, e)| *e == exponents) {
                Some((c, _)) => *c += coefficient,
                None => merged.push((coefficient, exponents)),
            }
        }
        merged.retain(|(c, _)| *c != 0.0);
        // Constants do not depend on the frame
        let frame = if merged.iter().all(|(_, e)| *e == [0, 0, 0]) {
            Frame::IDENTITY
        } else {
            frame
        };
        Self { terms: merged, frame }
    }

    /// Coefficients with respect to the local coordinates of [`Shape::frame`].
    pub fn terms(&self) -> &[(f64, Exponents)] {
        &self.terms
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    fn is_constant(&self) -> bool {
        self.terms.iter().all(|(_, e)| *e == [0, 0, 0])
    }

    /// Evaluates the polynomial at the given physical point.
    pub fn value(&self, point: &[f64; 3]) -> f64 {
        let xi = self.frame.local(point);
        self.terms
            .iter()
            .map(|(c, e)| c * xi[0].powi(e[0] as i32) * xi[1].powi(e[1] as i32) * xi[2].powi(e[2] as i32))
            .sum()
    }

    /// Partial derivative with respect to the given physical axis (0 = x, 1 = y, 2 = z).
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn diff(&self, axis: usize) -> Self {
        assert!(axis < 3, "Axis must be 0, 1 or 2");
        let inv_scale = 1.0 / self.frame.scale;
        let terms = self.terms.iter().filter(|(_, e)| e[axis] > 0).map(|&(c, e)| {
            let mut lowered = e;
            lowered[axis] -= 1;
            (c * f64::from(e[axis]) * inv_scale, lowered)
        });
        Self::from_local_terms(terms, self.frame)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::from_local_terms(self.terms.iter().map(|&(c, e)| (factor * c, e)), self.frame)
    }

    pub fn add(&self, other: &Shape) -> Self {
        if self.is_constant() && !other.is_constant() {
            return other.add(self);
        }
        let other = if other.is_constant() || other.frame == self.frame {
            other.terms.clone()
        } else {
            other.terms_in(&self.frame)
        };
        Self::from_local_terms(self.terms.iter().copied().chain(other), self.frame)
    }

    pub fn sub(&self, other: &Shape) -> Self {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Self {
        self.scale(-1.0)
    }

    /// Coefficients of the same polynomial with respect to the local coordinates of `target`.
    fn terms_in(&self, target: &Frame) -> Vec<(f64, Exponents)> {
        // ξ_self = a + b ξ_target along every axis
        let b = target.scale / self.frame.scale;
        let a = [0, 1, 2].map(|axis| (target.origin[axis] - self.frame.origin[axis]) / self.frame.scale);

        let mut expanded = Vec::new();
        for &(c, e) in &self.terms {
            let mut partial = vec![(c, [0u8; 3])];
            for axis in 0..3 {
                let p = e[axis];
                let mut next = Vec::with_capacity(partial.len() * (usize::from(p) + 1));
                for &(coefficient, exponents) in &partial {
                    for q in 0..=p {
                        let factor = binomial(p, q) * a[axis].powi(i32::from(p - q)) * b.powi(i32::from(q));
                        let mut raised = exponents;
                        raised[axis] = q;
                        next.push((coefficient * factor, raised));
                    }
                }
                partial = next;
            }
            expanded.extend(partial);
        }
        expanded
    }
}

fn binomial(n: u8, k: u8) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let names: Vec<String> = ["x", "y", "z"]
            .iter()
            .zip(self.frame.origin)
            .map(|(name, origin)| {
                if self.frame == Frame::IDENTITY {
                    name.to_string()
                } else {
                    format!("(({} - {}) / {})", name, origin, self.frame.scale)
                }
            })
            .collect();
        for (i, (c, e)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", c)?;
            for (name, &power) in names.iter().zip(e) {
                match power {
                    0 => {}
                    1 => write!(f, "*{}", name)?,
                    _ => write!(f, "*{}^{}", name, power)?,
                }
            }
        }
        Ok(())
    }
}
