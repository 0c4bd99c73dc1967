mod coordinate;
mod resolver;

pub use coordinate::LibraryCoordinate;
pub use resolver::{ClasspathMap, LibraryPlan, LibraryResolver, NativeArchive, DEFAULT_NATIVE_EXCLUDES};
