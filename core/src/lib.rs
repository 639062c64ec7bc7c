//! Core engine for wallsort.
//!
//! Images in a main directory are compared against a target display
//! resolution. Those falling short in either dimension are moved into a
//! quarantine subdirectory, and quarantined images that meet the current
//! target are moved back. Pixel sizes come from a [`DimensionSource`],
//! normally the external `identify` tool.

pub mod operations;
pub mod probe;
pub mod progress;
pub mod reporting;
pub mod resolution;
pub mod scanner;
pub mod sorter;

pub use operations::{move_file, resolve_destination, CollisionPolicy, MoveError};
pub use probe::{parse_dimensions, DimensionSource, Dimensions, IdentifyProbe, StaticDimensions};
pub use reporting::{print_summary, write_json, ReportingError};
pub use resolution::{
    is_low_res, InvalidTarget, ResolutionTarget, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH,
    DEFAULT_TOLERANCE,
};
pub use scanner::{
    default_extensions, has_image_extension, list_regular_files, IMAGE_EXTENSIONS,
};
pub use sorter::{
    run, sort, FileAction, SortConfig, SortError, SortOutcome, DEFAULT_QUARANTINE_DIR_NAME,
};
