use swf_core::{DataError, FormatError};

use crate::trace::TraceError;

#[derive(thiserror::Error, Debug)]
pub enum UnpackError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("expected clip actions on PlaceObject2")]
    NoClipActions,

    #[error("DefineButton2 has no actions")]
    NoButtonActions,

    #[error("extra data after the last clip action record: {count} bytes")]
    TrailingBytes { count: usize },

    #[error("recovered code of {size} bytes does not fit a {width}-byte size field")]
    SizeOverflow { size: usize, width: usize },

    #[error("no tag following marker tag {code} at {path}")]
    MissingSuccessor { code: u16, path: String },

    #[error("no fix for tag {code} at {path}")]
    NoLocator { code: u16, path: String },

    #[error("tag {code} at {path}: {source}")]
    Tag {
        code: u16,
        path: String,
        #[source]
        source: Box<UnpackError>,
    },
}
