pub mod record_parser;
pub mod station_file;

pub use record_parser::{parse_date_key, ParsedLine, RecordParser, RejectReason};
pub use station_file::{station_id_from_path, LoadedStationFile, StationFile};
