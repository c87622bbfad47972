use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xylem::{
	mirror::{Derivation, Matrix4, SyncRejection, Value},
	Config, Error, Operation, RenderMode,
};

mod session_;
use session_::{root, session};

fn sample() -> Matrix4<f32> {
	Matrix4::from_rows([
		[1.0, 2.0, 3.0, 4.0],
		[5.0, 6.0, 7.0, 8.0],
		[9.0, 10.0, 11.0, 12.0],
		[13.0, 14.0, 15.0, 16.0],
	])
}

#[test]
fn derived_value_follows_base() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;

	let base = state.register_matrix(root, Matrix4::identity())?;
	let transposed = state.mirror_mut().derive_transposed(base)?;
	assert_eq!(state.mirror().log(transposed)?, &[Derivation::Transpose][..]);
	assert!(state.mirror().log(base)?.is_empty());

	state.mirror_mut().set(base, Value::Matrix(sample()))?;
	assert_eq!(state.mirror().value(transposed)?, Value::Matrix(sample().transpose()));

	assert_eq!(state.mirror_mut().set(transposed, Value::Matrix(sample())), Err(Error::DerivedMirror(transposed.id())));
	assert_eq!(
		state.mirror_mut().set(base, Value::Vector(vec![0.0; 4])),
		Err(Error::LengthMismatch {
			id: base.id(),
			expected: 16,
			found: 4,
		})
	);
	Ok(())
}

#[test]
fn chained_derivations() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;

	let scale = Matrix4::from_rows([[2.0, 0.0, 0.0, 0.0], [0.0, 2.0, 0.0, 0.0], [0.0, 0.0, 2.0, 0.0], [0.0, 0.0, 0.0, 1.0]]);
	let base = state.register_matrix(root, scale)?;
	let inverted = state.mirror_mut().derive_inverted(base)?;
	let product = state.mirror_mut().derive_multiplied(inverted, scale)?;
	assert_eq!(state.mirror().log(product)?, &[Derivation::Invert, Derivation::Multiply(scale)][..]);
	assert_eq!(state.mirror().value(product)?, Value::Matrix(Matrix4::identity()));

	state.mirror_mut().set(base, Value::Matrix(Matrix4::from_rows([[0.0; 4]; 4])))?;
	assert_eq!(state.mirror().value(product), Err(Error::SingularMatrix(product.id())));

	let vector = state.register_vector(root, vec![1.0, 2.0])?;
	assert_eq!(state.mirror_mut().derive_transposed(vector), Err(Error::NotAMatrix(vector.id())));
	Ok(())
}

#[test]
fn client_reference_and_initialisation() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let (root, base, transposed) = {
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		let base = state.register_vector(root, vec![1.0, 0.5, f32::INFINITY])?;
		let matrix = state.register_matrix(root, Matrix4::identity())?;
		let transposed = state.mirror_mut().derive_transposed(matrix)?;
		assert_eq!(state.mirror().js_ref(transposed, "Xylem")?, "Xylem.jsValues[2]");
		(root, base, transposed)
	};

	let program = lock.render(RenderMode::Update)?;
	let scripts: Vec<_> = program
		.operations
		.iter()
		.filter_map(|operation| match operation {
			Operation::Script(script) => Some(script.as_str()),
			_ => None,
		})
		.collect();
	assert_eq!(scripts.len(), 3);
	assert_eq!(scripts[0], "Xylem.jsValues[0]=new Float32Array([1,0.5,Infinity]);");
	assert_eq!(scripts[2], "Xylem.jsValues[2]=Xylem.mat4.transpose(Xylem.mat4.create(),Xylem.jsValues[1]);");

	// Only changed values are sent again.
	lock.state()?.mirror_mut().set(base, Value::Vector(vec![0.0, 0.0, 0.0]))?;
	assert_eq!(
		lock.render(RenderMode::Update)?.operations,
		vec![Operation::Script("Xylem.jsValues[0]=new Float32Array([0,0,0]);".to_owned())]
	);

	// Values go away with their owner.
	let mut state = lock.state()?;
	state.destroy(root)?;
	assert!(state.mirror().is_empty());
	assert_eq!(state.mirror().value(transposed), Err(Error::UnknownMirror(transposed.id())));
	Ok(())
}

#[test]
fn no_initialisation_without_client_representation() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	{
		let mut state = lock.state()?;
		let orphan = state.create(xylem::ElementKind::Canvas);
		state.register_vector(orphan, vec![1.0])?;
	}
	assert!(lock.render(RenderMode::Update)?.is_empty());
	Ok(())
}

#[test]
fn foreign_session_handle() -> Result<(), Error> {
	let first = session(Config::default());
	let second = session(Config::default());

	let mirror = {
		let lock = first.lock()?;
		let mut state = lock.state()?;
		let root = root(&mut state)?;
		state.register_vector(root, vec![1.0])?
	};

	let lock = second.lock()?;
	let state = lock.state()?;
	assert_eq!(
		state.mirror().value(mirror),
		Err(Error::ForeignSession {
			expected: second.id(),
			found: first.id(),
		})
	);
	Ok(())
}

#[test]
fn reverse_sync() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;

	let mut vectors = Vec::new();
	for _ in 0..8 {
		vectors.push(state.register_vector(root, vec![0.0; 4])?);
	}

	let report = state.apply_reverse_sync("3:1,2,3,4;7:Infinity,-Infinity,0,0;9:0,0;");
	assert_eq!(report.applied.iter().map(|id| id.get()).collect::<Vec<_>>(), vec![3, 7]);
	match report.rejected.as_slice() {
		[SyncRejection::Unknown(id)] => assert_eq!(id.get(), 9),
		other => panic!("unexpected rejections: {:?}", other),
	}
	assert_eq!(state.mirror().value(vectors[3])?, Value::Vector(vec![1.0, 2.0, 3.0, 4.0]));
	assert_eq!(state.mirror().value(vectors[7])?, Value::Vector(vec![f32::INFINITY, f32::NEG_INFINITY, 0.0, 0.0]));
	assert_eq!(state.mirror().value(vectors[0])?, Value::Vector(vec![0.0; 4]));
	Ok(())
}

#[test]
fn reverse_sync_rejections_are_contained() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;

	let matrix = state.register_matrix(root, Matrix4::identity())?;
	let derived = state.mirror_mut().derive_transposed(matrix)?;
	let vector = state.register_vector(root, vec![0.0; 2])?;

	let report = state.apply_reverse_sync("1:0;nonsense;2:1,inf;2:5,6;;2:7,8;");
	assert_eq!(report.applied, vec![vector.id()]);
	assert_eq!(
		report.rejected,
		vec![
			SyncRejection::Derived(derived.id()),
			SyncRejection::Malformed {
				index: 1,
				record: "nonsense".to_owned()
			},
			SyncRejection::Malformed {
				index: 2,
				record: "2:1,inf".to_owned()
			},
		]
	);
	// Everything after the empty record is ignored.
	assert_eq!(state.mirror().value(vector)?, Value::Vector(vec![5.0, 6.0]));

	let report = state.apply_reverse_sync("0:1,2,3;");
	assert_eq!(
		report.rejected,
		vec![SyncRejection::LengthMismatch {
			id: matrix.id(),
			expected: 16,
			found: 3
		}]
	);
	Ok(())
}

#[test]
fn wire_format_is_column_major() -> Result<(), Error> {
	let session = session(Config::default());
	let lock = session.lock()?;
	let mut state = lock.state()?;
	let root = root(&mut state)?;
	state.register_matrix(root, sample())?;
	state.register_vector(root, vec![-1.5, f32::NEG_INFINITY])?;
	assert_eq!(state.mirror().wire_format(), "0:1,5,9,13,2,6,10,14,3,7,11,15,4,8,12,16;1:-1.5,-Infinity;");
	Ok(())
}

fn component() -> impl Strategy<Value = f32> {
	use proptest::num::f32::{INFINITE, NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
	POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

proptest! {
	#[test]
	fn wire_format_survives_reverse_sync(values in proptest::collection::vec(proptest::collection::vec(component(), 1..6), 1..5)) {
		let source = session(Config::default());
		let target = session(Config::default());

		let wire = {
			let lock = source.lock().unwrap();
			let mut state = lock.state().unwrap();
			let root = root(&mut state).unwrap();
			for value in &values {
				state.register_vector(root, value.clone()).unwrap();
			}
			state.mirror().wire_format()
		};

		let lock = target.lock().unwrap();
		let mut state = lock.state().unwrap();
		let root = root(&mut state).unwrap();
		let mirrors: Vec<_> = values.iter().map(|value| state.register_vector(root, vec![0.0; value.len()]).unwrap()).collect();

		let report = state.apply_reverse_sync(&wire);
		prop_assert!(report.rejected.is_empty());
		for (mirror, value) in mirrors.into_iter().zip(values) {
			prop_assert_eq!(state.mirror().value(mirror).unwrap(), Value::Vector(value));
		}
	}
}
