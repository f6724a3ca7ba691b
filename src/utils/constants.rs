/// Source value meaning "not recorded" in any measurement column
pub const MISSING_VALUE_SENTINEL: i32 = -9999;

/// Station file layout
pub const FIELD_DELIMITER: char = '\t';
pub const FIELDS_PER_LINE: usize = 4;
pub const DATE_KEY_FORMAT: &str = "%Y%m%d";
pub const DATE_KEY_LEN: usize = 8;
pub const MIN_DATE_YEAR: i32 = 1;

/// Configuration defaults
pub const DEFAULT_DATA_PATH: &str = "/app/data/wx_data";
pub const DEFAULT_FILE_PATTERN: &str = "*.txt";
pub const DEFAULT_DATABASE_PATH: &str = "weather.db";
pub const ENV_PREFIX: &str = "WX";

/// Pagination
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

pub const SCHEMA_VERSION: i64 = 1;
