/// Directory, relative to the media root, that holds recipe images.
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Multipart field carrying the uploaded recipe image.
pub const IMAGE_FIELD: &str = "image";

pub const JSON_BODY_LIMIT: u64 = 16 * 1024;

pub const NAME_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 5;

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://recepie.db?mode=rwc";
pub const DEFAULT_MEDIA_ROOT: &str = "./media";
pub const DEFAULT_TOKEN_TTL_HOURS: &str = "24";
pub const DEFAULT_MAX_CONNECTIONS: &str = "5";
pub const DEFAULT_MAX_UPLOAD_BYTES: &str = "5242880";
