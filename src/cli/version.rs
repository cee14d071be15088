use crate::cnf::RELEASE;
use crate::err::Error;

pub fn init() -> Result<(), Error> {
	println!("{}", *RELEASE);
	Ok(())
}
