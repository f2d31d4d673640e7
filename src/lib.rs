pub mod error;
pub mod header;
pub mod payload;
pub mod container;

pub use error::FormatError;
pub use header::{Endian, FieldLayout, Header, HeaderField, SaveVariant};
pub use payload::EncodedPayload;
pub use container::{Container, ContainerState, OpenOptions, SaveFormat, CONTAINER_SIZE};
