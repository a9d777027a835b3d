use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// Where in a transaction an acknowledge was missing
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Stage {
	/// addressing byte with the R/W bit clear
	AddressWrite,
	/// addressing byte with the R/W bit set (usually after a repeated start)
	AddressRead,
	/// n-th data byte written after the addressing byte (counting from 0)
	Data(usize),
	/// addressing byte of a combined transfer; the kernel doesn't say which
	Address,
	Unknown,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Stage::AddressWrite => write!(f, "address (write)"),
			Stage::AddressRead => write!(f, "address (read)"),
			Stage::Data(n) => write!(f, "data byte {}", n),
			Stage::Address => write!(f, "address"),
			Stage::Unknown => write!(f, "a byte"),
		}
	}
}

#[derive(Debug, Fail)]
pub enum DeviceError {
	#[fail(display = "device 0x{:02x} did not acknowledge {}", address, stage)]
	Nack {
		address: u8,
		stage: Stage,
	},
	#[fail(display = "invalid argument: {}", _0)]
	InvalidArgument(String),
	#[fail(display = "out of memory allocating a {} byte transfer buffer", _0)]
	OutOfMemory(usize),
}

impl DeviceError {
	pub fn invalid<S: Into<String>>(msg: S) -> Self {
		DeviceError::InvalidArgument(msg.into())
	}

	pub fn io_kind(&self) -> io::ErrorKind {
		match self {
			DeviceError::Nack { .. } => io::ErrorKind::Other,
			DeviceError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
			DeviceError::OutOfMemory(_) => io::ErrorKind::Other,
		}
	}
}

pub fn transfer_buffer(len: usize) -> crate::AResult<Vec<u8>> {
	let mut buf = Vec::new();
	buf.try_reserve_exact(len).map_err(|_: TryReserveError| DeviceError::OutOfMemory(len))?;
	Ok(buf)
}

pub fn device_error(e: &failure::Error) -> Option<&DeviceError> {
	e.iter_chain().filter_map(|c| c.downcast_ref::<DeviceError>()).next()
}

pub fn into_io_error(e: failure::Error) -> io::Error {
	let kind = match device_error(&e) {
		Some(de) => de.io_kind(),
		None => io::ErrorKind::Other,
	};
	io::Error::new(kind, format!("{}", e))
}
