/// Origin assigned to every resolved path that is not a `meta` path.
pub const DEFAULT_ORIGIN: &str = "openconfig";

/// First element name reserved for non-OpenConfig metadata paths.
pub const META_ELEM: &str = "meta";

pub(crate) const SUBSCRIBE_METHOD: &str = "Subscribe";
pub(crate) const GET_METHOD: &str = "Get";

/// Bundle key for data points whose path is shorter than the prefix length.
pub const ROOT_BUNDLE: &str = "/";

/// Capacity of the request channel feeding a subscribe stream.
pub(crate) const REQUEST_CHANNEL_CAPACITY: usize = 8;
