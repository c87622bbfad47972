use pretty_assertions::assert_eq;
use xylem::flags::{Dirty, Flag};

#[test]
fn all_is_every_flag_in_emission_order() {
	assert_eq!(Dirty::all().iter().collect::<Vec<_>>(), Flag::ALL.to_vec());
	assert_eq!(Flag::ALL.first(), Some(&Flag::Geometry));
	assert_eq!(Flag::ALL.last(), Some(&Flag::Hidden));
}

#[test]
fn take_consumes_once() {
	let mut dirty: Dirty = [Flag::Width, Flag::Signals].iter().copied().collect();
	assert!(dirty.take(Flag::Width));
	assert!(!dirty.take(Flag::Width));
	assert!(!dirty.is_empty());

	dirty.clear_all();
	assert_eq!(dirty, Dirty::empty());
	assert_eq!(format!("{:?}", Dirty::from(Flag::ZIndex)), "{ZIndex}");
}
