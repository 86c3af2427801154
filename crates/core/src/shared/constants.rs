/// Fixed page size of the labeled-history endpoint.
pub const HISTORY_PAGE_SIZE: usize = 6;

/// JPEG quality for crop derivatives (0-100).
pub const CROP_JPEG_QUALITY: u8 = 90;

/// Remote dataset identifiers are 24-character hex strings.
pub const DATASET_ID_LEN: usize = 24;

/// Route prefix the remote store uses for stored image files.
pub const FILE_ROUTE_PREFIX: &str = "/api/dataset/file/";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Remote store request timeout, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
