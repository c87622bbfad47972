use core::{cmp::Ordering, ops::Mul};
use num_traits::Float;

/// A 4×4 matrix, stored row by row.
///
/// Client-facing representations (wire format and emitted scripts) are column-major, see
/// [`to_column_major`](`Matrix4::to_column_major`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4<F> {
	rows: [[F; 4]; 4],
}

impl<F: Float> Matrix4<F> {
	#[must_use]
	pub fn identity() -> Self {
		let mut rows = [[F::zero(); 4]; 4];
		for (i, row) in rows.iter_mut().enumerate() {
			row[i] = F::one();
		}
		Self { rows }
	}

	#[must_use]
	pub fn from_rows(rows: [[F; 4]; 4]) -> Self {
		Self { rows }
	}

	#[must_use]
	pub fn rows(&self) -> &[[F; 4]; 4] {
		&self.rows
	}

	#[must_use]
	pub fn get(&self, row: usize, column: usize) -> F {
		self.rows[row][column]
	}

	pub fn set(&mut self, row: usize, column: usize, value: F) {
		self.rows[row][column] = value
	}

	/// `None` unless `components` has exactly 16 elements.
	#[must_use]
	pub fn from_column_major(components: &[F]) -> Option<Self> {
		if components.len() != 16 {
			return None;
		}
		let mut matrix = Self { rows: [[F::zero(); 4]; 4] };
		for column in 0..4 {
			for row in 0..4 {
				matrix.rows[row][column] = components[column * 4 + row];
			}
		}
		Some(matrix)
	}

	#[must_use]
	pub fn to_column_major(&self) -> [F; 16] {
		let mut components = [F::zero(); 16];
		for column in 0..4 {
			for row in 0..4 {
				components[column * 4 + row] = self.rows[row][column];
			}
		}
		components
	}

	#[must_use]
	pub fn transpose(&self) -> Self {
		let mut transposed = *self;
		for row in 0..4 {
			for column in 0..4 {
				transposed.rows[column][row] = self.rows[row][column];
			}
		}
		transposed
	}

	/// Gauss-Jordan elimination with partial pivoting. `None` if the matrix is singular.
	#[must_use]
	pub fn inverse(&self) -> Option<Self> {
		let mut a = self.rows;
		let mut inverse = Self::identity().rows;

		for column in 0..4 {
			let pivot_row = (column..4).max_by(|&i, &j| a[i][column].abs().partial_cmp(&a[j][column].abs()).unwrap_or(Ordering::Equal))?;
			match a[pivot_row][column].abs().partial_cmp(&F::zero()) {
				Some(Ordering::Greater) => (),
				_ => return None,
			}
			a.swap(column, pivot_row);
			inverse.swap(column, pivot_row);

			let pivot = a[column][column];
			for k in 0..4 {
				a[column][k] = a[column][k] / pivot;
				inverse[column][k] = inverse[column][k] / pivot;
			}

			for row in (0..4).filter(|&row| row != column) {
				let factor = a[row][column];
				if factor == F::zero() {
					continue;
				}
				for k in 0..4 {
					a[row][k] = a[row][k] - factor * a[column][k];
					inverse[row][k] = inverse[row][k] - factor * inverse[column][k];
				}
			}
		}

		Some(Self { rows: inverse })
	}
}

impl<F: Float> Default for Matrix4<F> {
	fn default() -> Self {
		Self::identity()
	}
}

impl<F: Float> Mul for Matrix4<F> {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self {
		let mut product = Self { rows: [[F::zero(); 4]; 4] };
		for row in 0..4 {
			for column in 0..4 {
				product.rows[row][column] = (0..4).fold(F::zero(), |sum, k| sum + self.rows[row][k] * rhs.rows[k][column]);
			}
		}
		product
	}
}
